#![allow(dead_code)]

use eyre::Result;
use hmpc_common::{FieldElement, Matrix, MersennePrime};
use hmpc_engine::{
    execution::{
        local::LocalRuntime,
        player::Role,
        session::{MpcConfig, MpcContext},
    },
    protocol::sharing,
    shares::{BitBundle, Degree, ShareBundle},
};
use rand::distributions::{Distribution, Standard};
use tokio::task::JoinHandle;

/// Opt-in log output for debugging, driven by `RUST_LOG`. Installs a
/// thread-scoped default so it cannot clash with the global subscriber
/// that `#[tracing_test::traced_test]` registers.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    std::mem::forget(tracing::subscriber::set_default(subscriber));
}

pub fn setup<T: MersennePrime>(n: usize, t: usize) -> Vec<MpcContext<T>>
where
    Standard: Distribution<T>,
{
    LocalRuntime::mock_setup(MpcConfig::new(n, t).unwrap()).unwrap()
}

pub fn setup_with<T: MersennePrime>(config: MpcConfig) -> Vec<MpcContext<T>>
where
    Standard: Distribution<T>,
{
    LocalRuntime::mock_setup(config).unwrap()
}

/// Party 0 deals the given integers; everyone ends up with a share bundle.
pub async fn share_ints<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    rows: usize,
    cols: usize,
    values: &[i64],
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let secrets = (ctx.role().0 == 0).then(|| {
        Matrix::from_vec(
            rows,
            cols,
            values.iter().map(|&v| FieldElement::from_int(v)).collect(),
        )
    });
    sharing::input_bundle(ctx, Role(0), secrets.as_ref(), rows, cols, Degree::T).await
}

pub async fn share_floats<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    rows: usize,
    cols: usize,
    values: &[f64],
) -> Result<ShareBundle<T>>
where
    Standard: Distribution<T>,
{
    let secrets = (ctx.role().0 == 0).then(|| {
        Matrix::from_vec(
            rows,
            cols,
            values.iter().map(|&v| FieldElement::from_f64(v)).collect(),
        )
    });
    sharing::input_bundle(ctx, Role(0), secrets.as_ref(), rows, cols, Degree::T).await
}

/// Party 0 deals the LSB-first bit decompositions of the given values as a
/// `values.len() x l` bit bundle.
pub async fn share_bits_of<T: MersennePrime>(
    ctx: &mut MpcContext<T>,
    values: &[i64],
) -> Result<BitBundle<T>>
where
    Standard: Distribution<T>,
{
    let l = FieldElement::<T>::bit_length();
    let secrets = (ctx.role().0 == 0).then(|| {
        let elements: Vec<FieldElement<T>> =
            values.iter().map(|&v| FieldElement::from_int(v)).collect();
        Matrix::decompose_bits(&elements, l)
    });
    let bundle = sharing::input_bundle(
        ctx,
        Role(0),
        secrets.as_ref(),
        values.len(),
        l as usize,
        Degree::T,
    )
    .await?;
    Ok(BitBundle(bundle))
}

pub fn to_ints<T: MersennePrime>(m: &Matrix<T>) -> Vec<i64> {
    m.data().iter().map(|e| e.to_int()).collect()
}

pub fn to_floats<T: MersennePrime>(m: &Matrix<T>) -> Vec<f64> {
    m.data().iter().map(|e| e.to_f64()).collect()
}

/// Awaits every party task and unwraps both layers.
pub async fn join_parties<R: Send + 'static>(handles: Vec<JoinHandle<Result<R>>>) -> Vec<R> {
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap().unwrap());
    }
    out
}
