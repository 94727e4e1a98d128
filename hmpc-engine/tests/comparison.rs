mod common;

use hmpc_common::{FieldElement, Matrix};
use hmpc_engine::protocol;

#[tokio::test]
async fn bit_operators_match_their_truth_tables() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let a = common::share_ints(&mut ctx, 1, 4, &[0, 0, 1, 1]).await?;
            let b = common::share_ints(&mut ctx, 1, 4, &[0, 1, 0, 1]).await?;
            let a = hmpc_engine::shares::BitBundle(a);
            let b = hmpc_engine::shares::BitBundle(b);

            let xor = protocol::xor(&mut ctx, &a, &b).await?;
            let and = protocol::and(&mut ctx, &a, &b).await?;
            let or = protocol::or(&mut ctx, &a, &b).await?;

            let xor = protocol::reveal_to_all(&ctx, &xor.0).await?;
            let and = protocol::reveal_to_all(&ctx, &and.0).await?;
            let or = protocol::reveal_to_all(&ctx, &or.0).await?;
            Ok::<_, eyre::Report>((
                common::to_ints(&xor),
                common::to_ints(&and),
                common::to_ints(&or),
            ))
        }));
    }
    for (xor, and, or) in common::join_parties(handles).await {
        assert_eq!(xor, vec![0, 1, 1, 0]);
        assert_eq!(and, vec![0, 0, 0, 1]);
        assert_eq!(or, vec![0, 1, 1, 1]);
    }
}

#[tokio::test]
async fn if_else_selects_per_entry() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let cond =
                hmpc_engine::shares::BitBundle(common::share_ints(&mut ctx, 1, 2, &[1, 0]).await?);
            let a = common::share_ints(&mut ctx, 1, 2, &[10, 20]).await?;
            let b = common::share_ints(&mut ctx, 1, 2, &[-30, 40]).await?;
            let selected = protocol::if_else(&mut ctx, &cond, &a, &b).await?;
            let opened = protocol::reveal_to_all(&ctx, &selected).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![10, 40]);
    }
}

#[tokio::test]
async fn less_than_compares_public_against_shared_bits() {
    let public = [5i64, 9, 3, 7, 0, 123];
    let shared = [6i64, 9, 2, 15, 0, 124];
    let expected = vec![1i64, 0, 0, 1, 0, 1];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let shared_bits = common::share_bits_of(&mut ctx, &shared).await?;
            let elements: Vec<FieldElement<u32>> =
                public.iter().map(|&v| FieldElement::from_int(v)).collect();
            let public_bits =
                Matrix::decompose_bits(&elements, FieldElement::<u32>::bit_length());
            let less = protocol::less_than(&mut ctx, &public_bits, &shared_bits).await?;
            let opened = protocol::reveal_to_all(&ctx, &less.0).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, expected);
    }
}

#[tokio::test]
async fn less_than_on_shared_pairs_sweeps_the_orderings() {
    let a = [5i64, 9, 3, 7, 0, 123, 77];
    let b = [6i64, 9, 2, 15, 0, 124, 77];
    let expected = vec![1i64, 0, 0, 1, 0, 1, 0];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let a_bits = common::share_bits_of(&mut ctx, &a).await?;
            let b_bits = common::share_bits_of(&mut ctx, &b).await?;
            let less = protocol::less_than_shared(&mut ctx, &a_bits, &b_bits).await?;
            let opened = protocol::reveal_to_all(&ctx, &less.0).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, expected);
    }
}

#[tokio::test]
async fn lsb_matches_the_representation_parity() {
    let values = [0i64, 1, 2, 3, 6, 7, -1, -2];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 1, values.len(), &values).await?;
            let lsb = protocol::lsb(&mut ctx, &x).await?;
            let opened = protocol::reveal_to_all(&ctx, &lsb.0).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    let expected: Vec<i64> = values
        .iter()
        .map(|&v| FieldElement::<u32>::from_int(v).bit(0).to_int())
        .collect();
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, expected);
    }
}

#[tokio::test]
async fn msb_is_the_sign_of_the_encoded_value() {
    let values = [5i64, -5, 1, -1, 0, 1000, -1000];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 1, values.len(), &values).await?;
            let msb = protocol::msb(&mut ctx, &x).await?;
            let opened = protocol::reveal_to_all(&ctx, &msb.0).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![0, 1, 0, 1, 0, 0, 1]);
    }
}

#[tokio::test]
async fn relu_zeroes_the_negative_entries() {
    let values = [3i64, -2, 0, 5, -7];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 1, values.len(), &values).await?;
            let cond = protocol::drelu(&mut ctx, &x).await?;
            let plain = protocol::relu(&mut ctx, &x).await?;
            let (fused_cond, fused) = protocol::relu_fused(&mut ctx, &x).await?;

            let cond = protocol::reveal_to_all(&ctx, &cond.0).await?;
            let plain = protocol::reveal_to_all(&ctx, &plain).await?;
            let fused_cond = protocol::reveal_to_all(&ctx, &fused_cond.0).await?;
            let fused = protocol::reveal_to_all(&ctx, &fused).await?;
            Ok::<_, eyre::Report>((
                common::to_ints(&cond),
                common::to_ints(&plain),
                common::to_ints(&fused_cond),
                common::to_ints(&fused),
            ))
        }));
    }
    for (cond, plain, fused_cond, fused) in common::join_parties(handles).await {
        assert_eq!(cond, vec![1, 0, 1, 1, 0]);
        assert_eq!(fused_cond, cond);
        assert_eq!(plain, vec![3, 0, 0, 5, 0]);
        assert_eq!(fused, plain);
    }
}

#[tokio::test]
async fn maxpool_returns_the_maximum_and_its_position() {
    let values = [3i64, 1, 4, 1, 5, 9, 2, 6];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 1, values.len(), &values).await?;
            let (max, onehot) = protocol::maxpool(&mut ctx, &x).await?;
            let max = protocol::reveal_to_all(&ctx, &max).await?;
            let onehot = protocol::reveal_to_all(&ctx, &onehot.0).await?;
            Ok::<_, eyre::Report>((common::to_ints(&max), common::to_ints(&onehot)))
        }));
    }
    for (max, onehot) in common::join_parties(handles).await {
        assert_eq!(max, vec![9]);
        assert_eq!(onehot, vec![0, 0, 0, 0, 0, 1, 0, 0]);
    }
}

#[tokio::test]
async fn fused_maxpool_matches_the_plain_tournament() {
    // Even and odd widths; the odd one exercises the passthrough block.
    let even = [3i64, 1, 4, 1, 5, 9, 2, 6];
    let odd = [-3i64, 7, -1, 7, 2];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let mut out = Vec::new();
            for values in [&even[..], &odd[..]] {
                let x = common::share_ints(&mut ctx, 1, values.len(), values).await?;
                let (max_p, onehot_p) = protocol::maxpool(&mut ctx, &x).await?;
                let (max_f, onehot_f) = protocol::maxpool_fused(&mut ctx, &x).await?;
                let max_p = protocol::reveal_to_all(&ctx, &max_p).await?;
                let onehot_p = protocol::reveal_to_all(&ctx, &onehot_p.0).await?;
                let max_f = protocol::reveal_to_all(&ctx, &max_f).await?;
                let onehot_f = protocol::reveal_to_all(&ctx, &onehot_f.0).await?;
                out.push((
                    common::to_ints(&max_p),
                    common::to_ints(&onehot_p),
                    common::to_ints(&max_f),
                    common::to_ints(&onehot_f),
                ));
            }
            Ok::<_, eyre::Report>(out)
        }));
    }
    for out in common::join_parties(handles).await {
        let (max_p, onehot_p, max_f, onehot_f) = &out[0];
        assert_eq!(max_p, &vec![9]);
        assert_eq!(max_f, max_p);
        assert_eq!(onehot_p, &vec![0, 0, 0, 0, 0, 1, 0, 0]);
        assert_eq!(onehot_f, onehot_p);

        let (max_p, onehot_p, max_f, onehot_f) = &out[1];
        assert_eq!(max_p, &vec![7]);
        assert_eq!(max_f, max_p);
        assert_eq!(onehot_p, &vec![0, 1, 0, 0, 0]);
        assert_eq!(onehot_f, onehot_p);
    }
}

#[tokio::test]
async fn sequential_maxpool_agrees_with_the_tournament() {
    // Odd width exercises the passthrough column; negatives keep the
    // comparisons signed. The duplicated maximum must resolve to the
    // first occurrence.
    let values = [-3i64, 7, -1, 7, 2];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 1, values.len(), &values).await?;
            let (max_a, onehot_a) = protocol::maxpool(&mut ctx, &x).await?;
            let (max_b, onehot_b) = protocol::maxpool_sequential(&mut ctx, &x).await?;
            let max_a = protocol::reveal_to_all(&ctx, &max_a).await?;
            let onehot_a = protocol::reveal_to_all(&ctx, &onehot_a.0).await?;
            let max_b = protocol::reveal_to_all(&ctx, &max_b).await?;
            let onehot_b = protocol::reveal_to_all(&ctx, &onehot_b.0).await?;
            Ok::<_, eyre::Report>((
                common::to_ints(&max_a),
                common::to_ints(&onehot_a),
                common::to_ints(&max_b),
                common::to_ints(&onehot_b),
            ))
        }));
    }
    for (max_a, onehot_a, max_b, onehot_b) in common::join_parties(handles).await {
        assert_eq!(max_a, vec![7]);
        assert_eq!(max_b, vec![7]);
        assert_eq!(onehot_a, vec![0, 1, 0, 0, 0]);
        assert_eq!(onehot_b, onehot_a);
    }
}
