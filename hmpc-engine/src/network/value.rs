use eyre::WrapErr;
use hmpc_common::{FieldElement, MersennePrime};

/// Wire encoding of a batch of field elements.
pub fn encode_elements<T: MersennePrime>(elements: &[FieldElement<T>]) -> eyre::Result<Vec<u8>> {
    bincode::serialize(elements).wrap_err("failed to serialize field elements")
}

pub fn decode_elements<T: MersennePrime>(bytes: &[u8]) -> eyre::Result<Vec<FieldElement<T>>> {
    bincode::deserialize(bytes).wrap_err("failed to deserialize field elements")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let elements: Vec<FieldElement<u32>> = (0..10).map(FieldElement::from_int).collect();
        let bytes = encode_elements(&elements).unwrap();
        let decoded: Vec<FieldElement<u32>> = decode_elements(&bytes).unwrap();
        assert_eq!(elements, decoded);

        let empty: Vec<FieldElement<u64>> = Vec::new();
        let bytes = encode_elements(&empty).unwrap();
        let decoded: Vec<FieldElement<u64>> = decode_elements(&bytes).unwrap();
        assert!(decoded.is_empty());
    }
}
