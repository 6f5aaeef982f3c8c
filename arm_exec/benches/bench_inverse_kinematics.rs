//! # Inverse Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arm_lib::{
    arm_ctrl::{build_chain, ArmVariant, Geometry},
    kinematics::{position_of, JointUnits},
    motion::MotionInterpolator,
};

fn inverse_kinematics_benchmark(c: &mut Criterion) {
    // ---- Build the wrist rotate arm ----

    let geometry = Geometry {
        shoulder_height_m: 0.0738,
        upper_arm_m: 0.146,
        forearm_m: 0.185,
        wrist_to_gripper_m: 0.0358,
        wrist_rotate_m: 0.0574,
    };
    let mut chain = build_chain(&geometry, ArmVariant::WristRotate);

    let zero = [0.0; 4];
    let near = position_of(&chain.pose(&[10.0, 5.0, -5.0, 0.0], JointUnits::Degrees).unwrap());
    let far = position_of(&chain.pose(&[60.0, 30.0, -45.0, 20.0], JointUnits::Degrees).unwrap());

    // Target close to the seed
    c.bench_function("KinematicChain::inverse_kinematics::near", |b| {
        b.iter(|| {
            chain
                .inverse_kinematics(black_box(&zero[..]), JointUnits::Degrees, &near)
                .unwrap()
        })
    });

    // Target needing a long search
    c.bench_function("KinematicChain::inverse_kinematics::far", |b| {
        b.iter(|| {
            chain
                .inverse_kinematics(black_box(&zero[..]), JointUnits::Degrees, &far)
                .unwrap()
        })
    });

    // One cycle of a large rate limited move, with the collision check on
    // every substep
    c.bench_function("MotionInterpolator::advance", |b| {
        b.iter(|| {
            let mut motion = MotionInterpolator::new(vec![0.0; 4], vec![400.0; 4]);
            motion
                .advance(&mut chain, black_box(0.1), &[40.0, 30.0, -20.0, 10.0])
                .unwrap()
        })
    });
}

criterion_group!(benches, inverse_kinematics_benchmark);
criterion_main!(benches);
