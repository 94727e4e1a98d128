mod common;

use hmpc_common::FieldElement;
use hmpc_engine::{
    execution::{player::Role, session::MpcConfig},
    phase::RandomnessBudget,
    protocol,
    randomness::RandomKind,
    shares::{Degree, Sharing},
    Error,
};
use rstest::rstest;

#[rstest]
#[case(3, 1)]
#[case(4, 1)]
#[case(5, 2)]
#[tokio::test]
async fn deal_and_reveal_round_trip(#[case] n: usize, #[case] t: usize) {
    common::init_tracing();
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(n, t) {
        handles.push(tokio::spawn(async move {
            let shared = common::share_ints(&mut ctx, 2, 3, &[1, -2, 3, 40, 0, -6]).await?;
            let opened = protocol::reveal_to_all(&ctx, &shared).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![1, -2, 3, 40, 0, -6]);
    }
}

#[tokio::test]
async fn a_threshold_of_shares_pins_down_no_secret() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let shared = common::share_ints(&mut ctx, 1, 1, &[42]).await?;
            Ok::<_, eyre::Report>((ctx.role().0, shared.shares.data()[0]))
        }));
    }
    let mut shares = [FieldElement::<u64>::from_int(0); 3];
    for (role, share) in common::join_parties(handles).await {
        shares[role] = share;
    }

    // Degree 1 over points 1 and 2: the secret is 2 f(1) - f(2).
    let two = FieldElement::from_int(2);
    assert_eq!(two * shares[0] - shares[1], FieldElement::from_int(42));

    // Party 0's share alone is consistent with every claimed secret: for
    // each claim there is a second share reconstructing exactly to it.
    for claim in [0i64, 1, -7, 1 << 40] {
        let forged = two * shares[0] - FieldElement::from_int(claim);
        assert_eq!((two * shares[0] - forged).to_int(), claim);
    }

    // And perturbing the honest second share moves the reconstruction off
    // the secret, so t real shares plus noise reveal nothing.
    let noisy = shares[1] + FieldElement::from_int(1);
    assert_ne!(two * shares[0] - noisy, FieldElement::from_int(42));
}

#[tokio::test]
async fn reveal_to_single_target_stays_private() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let shared = common::share_ints(&mut ctx, 1, 2, &[11, -7]).await?;
            let opened = protocol::reveal_to(&ctx, &shared, Role(1)).await?;
            Ok::<_, eyre::Report>((ctx.role().0, opened.map(|m| common::to_ints(&m))))
        }));
    }
    for (role, opened) in common::join_parties(handles).await {
        if role == 1 {
            assert_eq!(opened, Some(vec![11, -7]));
        } else {
            assert_eq!(opened, None);
        }
    }
}

#[rstest]
#[case(3, 1)]
#[case(4, 1)]
#[case(5, 2)]
#[tokio::test]
async fn multiplication_reduces_back_to_degree_t(#[case] n: usize, #[case] t: usize) {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(n, t) {
        handles.push(tokio::spawn(async move {
            let a = common::share_ints(&mut ctx, 1, 4, &[1, -2, 3, 4]).await?;
            let b = common::share_ints(&mut ctx, 1, 4, &[5, 6, -7, 8]).await?;
            let product = protocol::mul(&mut ctx, &a, &b).await?;
            // The product composes with further multiplications.
            let cubed = protocol::mul(&mut ctx, &product, &a).await?;
            let opened = protocol::reveal_to_all(&ctx, &cubed).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![5, 24, -63, 128]);
    }
}

#[tokio::test]
async fn fixed_point_products_truncate_within_tolerance() {
    let inputs_a = [2.5, -3.25, 0.0, 1.5];
    let inputs_b = [-3.0, -2.0, 7.5, 0.125];
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let a = common::share_floats(&mut ctx, 1, 4, &inputs_a).await?;
            let b = common::share_floats(&mut ctx, 1, 4, &inputs_b).await?;
            let d = hmpc_common::FieldElement::<u64>::fixed_precision();

            // Fused reduce-and-truncate of the raw degree-2t product.
            let fused = protocol::reduce_truncate(&mut ctx, &a.mul_local(&b), d).await?;
            // Separate reduction followed by plain truncation.
            let reduced = protocol::reduce_degree(&mut ctx, &a.mul_local(&b)).await?;
            let plain = protocol::truncate(&mut ctx, &reduced, d).await?;

            let fused = protocol::reveal_to_all(&ctx, &fused).await?;
            let plain = protocol::reveal_to_all(&ctx, &plain).await?;
            Ok::<_, eyre::Report>((common::to_floats(&fused), common::to_floats(&plain)))
        }));
    }
    let tolerance = 2.0 / (1u64 << 13) as f64;
    for (fused, plain) in common::join_parties(handles).await {
        for (k, (&x, &y)) in inputs_a.iter().zip(&inputs_b).enumerate() {
            assert!((fused[k] - x * y).abs() <= tolerance, "fused {} != {}", fused[k], x * y);
            assert!((plain[k] - x * y).abs() <= tolerance, "plain {} != {}", plain[k], x * y);
        }
    }
}

#[tokio::test]
async fn fixed_point_end_to_end_on_the_small_field() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u32>(3, 1) {
        handles.push(tokio::spawn(async move {
            let a = common::share_floats(&mut ctx, 1, 1, &[5.0]).await?;
            let b = common::share_floats(&mut ctx, 1, 1, &[-2.5]).await?;
            let d = hmpc_common::FieldElement::<u32>::fixed_precision();
            let product = protocol::reduce_truncate(&mut ctx, &a.mul_local(&b), d).await?;
            let opened = protocol::reveal_to_all(&ctx, &product).await?;
            Ok::<_, eyre::Report>(common::to_floats(&opened))
        }));
    }
    let tolerance = 2.0 / (1u32 << 12) as f64;
    for opened in common::join_parties(handles).await {
        assert!((opened[0] + 12.5).abs() <= tolerance);
    }
}

#[tokio::test]
async fn scalar_sharings_follow_the_bundle_protocols() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let me = ctx.role().0;
            let a = protocol::input_scalar(
                &mut ctx,
                Role(0),
                (me == 0).then(|| FieldElement::from_int(6)),
                Degree::T,
            )
            .await?;
            let b = protocol::input_scalar(
                &mut ctx,
                Role(1),
                (me == 1).then(|| FieldElement::from_int(-4)),
                Degree::T,
            )
            .await?;

            // Linear algebra stays local; a constant sharing is the same
            // value at every party.
            let five = Sharing::new(FieldElement::from_int(5), Degree::T);
            let diff = a - b;
            let scaled = (a + five).scale(FieldElement::from_int(2));
            let negated = -scaled.add_public(FieldElement::from_int(3));

            // Products go through the same reduction as bundles.
            let product = Sharing::from_bundle(
                &protocol::reduce_degree(&mut ctx, &a.mul_local(&b).into_bundle()).await?,
            );
            let mut acc = product;
            acc += a;
            acc -= b;

            let mut opened = Vec::new();
            for s in [diff, scaled, negated, product, acc] {
                opened.push(protocol::open_scalar(&ctx, s).await?.to_int());
            }
            Ok::<_, eyre::Report>(opened)
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![10, 22, -25, -24, -14]);
    }
}

#[tokio::test]
async fn prefix_products_run_along_rows() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 2, 3, &[2, 3, 4, 1, 5, 7]).await?;
            let prefixed = protocol::prefix_mult(&mut ctx, &x).await?;
            let fanned = protocol::mult_all(&mut ctx, &x).await?;
            let prefixed = protocol::reveal_to_all(&ctx, &prefixed).await?;
            let fanned = protocol::reveal_to_all(&ctx, &fanned).await?;
            Ok::<_, eyre::Report>((common::to_ints(&prefixed), common::to_ints(&fanned)))
        }));
    }
    for (prefixed, fanned) in common::join_parties(handles).await {
        assert_eq!(prefixed, vec![2, 6, 24, 1, 5, 35]);
        assert_eq!(fanned, vec![24, 35]);
    }
}

#[tokio::test]
async fn prefix_products_survive_a_chain_length_change() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            // Leftover pairs generated for 3-chains must not leak into the
            // 4-wide request below.
            ctx.preprocess(RandomnessBudget {
                unbounded_rows: 2,
                unbounded_cols: 3,
                ..Default::default()
            })
            .await?;
            let x = common::share_ints(&mut ctx, 1, 4, &[2, 3, 4, 5]).await?;
            let prefixed = protocol::prefix_mult(&mut ctx, &x).await?;
            let opened = protocol::reveal_to_all(&ctx, &prefixed).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![2, 6, 24, 120]);
    }
}

#[tokio::test]
async fn postfix_products_mirror_the_prefix() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let x = common::share_ints(&mut ctx, 1, 4, &[2, 3, 4, 5]).await?;
            let postfixed = protocol::postfix_mult(&mut ctx, &x).await?;
            let opened = protocol::reveal_to_all(&ctx, &postfixed).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![120, 60, 20, 5]);
    }
}

#[tokio::test]
async fn truncation_stays_within_tolerance_over_random_trials() {
    use rand::{Rng, SeedableRng};
    const TRIALS: usize = 64;
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            // Every party derives the same inputs; party 0 deals them.
            let mut rng = rand::rngs::StdRng::seed_from_u64(0x7a11);
            let xs: Vec<f64> = (0..TRIALS).map(|_| rng.gen_range(-50.0..50.0)).collect();
            let ys: Vec<f64> = (0..TRIALS).map(|_| rng.gen_range(-50.0..50.0)).collect();
            let a = common::share_floats(&mut ctx, 1, TRIALS, &xs).await?;
            let b = common::share_floats(&mut ctx, 1, TRIALS, &ys).await?;
            let d = FieldElement::<u64>::fixed_precision();
            let product = protocol::reduce_truncate(&mut ctx, &a.mul_local(&b), d).await?;
            let opened = protocol::reveal_to_all(&ctx, &product).await?;
            Ok::<_, eyre::Report>((xs, ys, common::to_floats(&opened)))
        }));
    }
    let tolerance = 2.0 / (1u64 << 13) as f64;
    for (xs, ys, opened) in common::join_parties(handles).await {
        for k in 0..TRIALS {
            let exact = xs[k] * ys[k];
            assert!(
                (opened[k] - exact).abs() <= tolerance,
                "trial {k}: {} != {exact}",
                opened[k]
            );
        }
    }
}

#[tokio::test]
async fn dealer_sampled_inputs_open_consistently() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            let random =
                protocol::input_random(&mut ctx, Role(2), 1, 5, hmpc_engine::shares::Degree::T)
                    .await?;
            let opened = protocol::reveal_to_all(&ctx, &random).await?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    let openings = common::join_parties(handles).await;
    for opened in &openings {
        assert_eq!(opened, &openings[0]);
        assert_eq!(opened.len(), 5);
    }
}

#[tokio::test]
async fn true_offline_runs_fail_without_preprocessing() {
    let config = MpcConfig::new(3, 1).unwrap().with_true_offline(true);
    let mut handles = Vec::new();
    for mut ctx in common::setup_with::<u64>(config.clone()) {
        handles.push(tokio::spawn(async move {
            ctx.start_online()?;
            let err = ctx.take_random_sharings(4).await.unwrap_err();
            let kind = match err.downcast_ref::<Error>() {
                Some(Error::InsufficientRandomness { kind, .. }) => *kind,
                other => panic!("unexpected error: {other:?}"),
            };
            ctx.end_online()?;
            Ok::<_, eyre::Report>(kind)
        }));
    }
    for kind in common::join_parties(handles).await {
        assert_eq!(kind, RandomKind::Sharing);
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn preprocessing_budget_covers_the_online_phase() {
    let config = MpcConfig::new(3, 1).unwrap().with_true_offline(true);
    let mut handles = Vec::new();
    for mut ctx in common::setup_with::<u64>(config.clone()) {
        handles.push(tokio::spawn(async move {
            ctx.start_offline()?;
            ctx.preprocess(RandomnessBudget {
                sharings: 8,
                reduced_pairs: 8,
                ..Default::default()
            })
            .await?;
            ctx.end_offline()?;

            ctx.start_online()?;
            let a = common::share_ints(&mut ctx, 1, 4, &[1, 2, 3, 4]).await?;
            let b = common::share_ints(&mut ctx, 1, 4, &[5, 6, 7, 8]).await?;
            let product = protocol::mul(&mut ctx, &a, &b).await?;
            let opened = protocol::reveal_to_all(&ctx, &product).await?;
            ctx.end_online()?;

            assert!(ctx.phase().offline.messages_sent > 0);
            assert!(ctx.phase().online.messages_sent > 0);
            assert!(ctx.phase().produced.reduced_pairs >= 8);
            ctx.report_stats();
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![5, 12, 21, 32]);
    }
    assert!(logs_contain("phase statistics"));
}

#[tokio::test]
async fn on_demand_generation_detours_through_the_offline_phase() {
    let mut handles = Vec::new();
    for mut ctx in common::setup::<u64>(3, 1) {
        handles.push(tokio::spawn(async move {
            ctx.start_online()?;
            let a = common::share_ints(&mut ctx, 1, 2, &[3, -4]).await?;
            let product = protocol::mul(&mut ctx, &a, &a).await?;
            let opened = protocol::reveal_to_all(&ctx, &product).await?;
            assert!(ctx.phase().is_online());
            assert!(ctx.phase().offline.messages_sent > 0);
            ctx.end_online()?;
            Ok::<_, eyre::Report>(common::to_ints(&opened))
        }));
    }
    for opened in common::join_parties(handles).await {
        assert_eq!(opened, vec![9, 16]);
    }
}
