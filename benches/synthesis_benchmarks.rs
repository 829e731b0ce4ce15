
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use needle_emg::config::SimulationConfig;
use needle_emg::processing::{time_expand, ZeroPhaseBandPass};
use needle_emg::simulation::{
    Electrode, Fibre, FibreContact, FibrePotentialGenerator, GaussianJitter, JitterMode, Mup, SynthesisOptions,
};

const MUP_LENGTHS: &[usize] = &[256, 512, 1024];
const EXPANSION_FACTORS: &[usize] = &[10, 30, 60];
const FIBRE_COUNTS: &[usize] = &[5, 20, 50];

fn single_fibre(radial_mm: f64) -> Electrode {
    let config = SimulationConfig::default();
    let mut settings = config.electrode.clone();
    settings.kind = needle_emg::config::ElectrodeKind::SingleFibre;
    Electrode::tip(
        &settings,
        &FibreContact {
            radial_distance_mm: radial_mm,
            axial_position_mm: 5.0,
        },
    )
}

fn fibre(id: i32) -> Fibre {
    Fibre {
        id,
        diameter_mm: 0.05,
        extent: None,
    }
}

fn benchmark_fibre_potential(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibre_potential");

    for &length in MUP_LENGTHS {
        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::new("propagating", length), &length, |b, &length| {
            let mut config = SimulationConfig::default();
            config.signal.mup_sample_count = length;
            let mut generator = FibrePotentialGenerator::new(&config).unwrap();
            let electrode = single_fibre(0.1);

            b.iter(|| generator.generate(black_box(&fibre(1)), black_box(&electrode)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_time_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_expand");
    let samples: Vec<f32> = (0..512).map(|i| (i as f32 * 0.07).sin() * (-(i as f32) / 200.0).exp()).collect();

    for &factor in EXPANSION_FACTORS {
        group.throughput(Throughput::Elements((samples.len() * factor) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(factor), &factor, |b, &factor| {
            b.iter(|| time_expand(black_box(&samples), factor).unwrap());
        });
    }

    group.finish();
}

fn benchmark_jittered_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("jittered_mup");
    let dir = tempfile::TempDir::new().unwrap();

    for &fibres in FIBRE_COUNTS {
        let mut config = SimulationConfig::default();
        config.mup.acceleration_threshold = 0.0;
        let mut generator = FibrePotentialGenerator::new(&config).unwrap();
        let mut mup = Mup::new(1, dir.path().join(format!("mup{}.dat", fibres)), &config);
        for id in 0..fibres {
            let waveform = generator.generate(&fibre(id as i32 + 1), &single_fibre(0.05 + 0.02 * id as f64)).unwrap();
            mup.add_mfp(&waveform, id as i32 + 1).unwrap();
        }

        let options = SynthesisOptions::from_config(&config, JitterMode::Individual);
        let mut jitter = GaussianJitter::new(Some(7));
        group.bench_with_input(BenchmarkId::new("individual", fibres), &fibres, |b, _| {
            b.iter(|| mup.calc_jittered_mup(black_box(&options), &mut jitter).unwrap());
        });
    }

    group.finish();
}

fn benchmark_band_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("band_pass");
    let rate = 31_250.0;
    let signal: Vec<f32> = (0..31_250).map(|i| (i as f32 * 0.3).sin() + 0.1 * (i as f32 * 0.001).sin()).collect();

    for &order in &[2, 4] {
        group.throughput(Throughput::Elements(signal.len() as u64));
        group.bench_with_input(BenchmarkId::new("zero_phase", order), &order, |b, &order| {
            let mut filter = ZeroPhaseBandPass::new(10.0, 10_000.0, order, rate).unwrap();
            b.iter(|| {
                let mut samples = signal.clone();
                filter.apply(black_box(&mut samples));
                samples
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_fibre_potential,
    benchmark_time_expansion,
    benchmark_jittered_synthesis,
    benchmark_band_pass
);
criterion_main!(benches);
