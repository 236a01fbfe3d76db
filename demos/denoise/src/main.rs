use argh::FromArgs;
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;

use imaging::{
    backend::DispatchReport,
    image::{Image, ImageBuffer, ImageSize},
    imgproc::metrics,
    Engine, EngineConfig, Operation,
};
use imaging_impulse_noise::{add_impulse_noise, NoiseType};

#[derive(FromArgs)]
/// Corrupt a synthetic image with impulse noise and restore it
struct Args {
    /// the filter to apply: vmf, atm or median
    #[argh(option, default = "String::from(\"vmf\")")]
    filter: String,

    /// the side of the synthetic image
    #[argh(option, default = "256")]
    size: usize,

    /// the fraction of corrupted pixels
    #[argh(option, default = "0.1")]
    density: f32,

    /// use random-value noise instead of salt-and-pepper
    #[argh(switch)]
    random_value: bool,

    /// the seed of the noise generator
    #[argh(option, default = "42")]
    seed: u64,

    /// blur the image and restore it with Richardson-Lucy as well
    #[argh(switch)]
    deconvolve: bool,

    /// path to a JSON engine configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// directory of plugin modules to list
    #[argh(option)]
    plugin_dir: Option<PathBuf>,
}

fn synthetic(size: usize) -> Result<Image<u8, 3>, Box<dyn std::error::Error>> {
    let inside = |v: usize| (size / 4..3 * size / 4).contains(&v);
    let mut data = Vec::with_capacity(size * size * 3);
    for y in 0..size {
        for x in 0..size {
            let r = (x * 255 / size) as u8;
            let g = (y * 255 / size) as u8;
            // a bright square in the middle
            let b = if inside(x) && inside(y) { 230 } else { 40 };
            data.extend_from_slice(&[r, g, b]);
        }
    }
    Ok(Image::new(ImageSize::from([size, size]), data)?)
}

fn psnr(a: &ImageBuffer, b: &ImageBuffer) -> Result<f32, Box<dyn std::error::Error>> {
    match (a.clone().into_f32()?, b.clone().into_f32()?) {
        (ImageBuffer::RgbF32(a), ImageBuffer::RgbF32(b)) => Ok(metrics::psnr(&a, &b, 255.0)?),
        (ImageBuffer::GrayF32(a), ImageBuffer::GrayF32(b)) => Ok(metrics::psnr(&a, &b, 255.0)?),
        _ => Err("buffers differ in layout".into()),
    }
}

fn print_report(name: &str, report: &DispatchReport, clean: &ImageBuffer, before: f32) {
    let after = psnr(&report.image, clean).unwrap_or(f32::NAN);
    println!(
        "{name}: {before:.2} dB -> {after:.2} dB on {} in {:.3} ms",
        report.backend,
        report.elapsed.as_secs_f64() * 1e3
    );
    if let Some(reason) = &report.fallback_reason {
        println!("  fallback: {reason}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if args.plugin_dir.is_some() {
        config.plugin_dir = args.plugin_dir.clone();
    }

    let engine = Engine::new(config);
    for (path, descriptor) in engine.registry().descriptors() {
        println!(
            "plugin {} {} ({}, \"{}\") at {}",
            descriptor.name,
            descriptor.version,
            descriptor.kind,
            descriptor.context_menu_label,
            path.display()
        );
    }
    for failure in engine.registry().failures() {
        println!("rejected {}: {}", failure.path.display(), failure.error);
    }

    let clean = synthetic(args.size)?;

    let noise_type = if args.random_value {
        NoiseType::RandomValue
    } else {
        NoiseType::SaltAndPepper
    };
    let mut noisy = clean.clone();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let corrupted = add_impulse_noise(&mut noisy, args.density, noise_type, &mut rng)?;
    log::info!("corrupted {corrupted} of {} pixels", clean.size().area());

    let clean = ImageBuffer::RgbU8(clean);
    let noisy = ImageBuffer::RgbU8(noisy);

    let op = match args.filter.to_lowercase().as_str() {
        "vmf" => Operation::VectorMedian,
        "atm" => Operation::AlphaTrimmedMean,
        "median" => Operation::Median,
        other => return Err(format!("unknown filter `{other}`").into()),
    };
    let report = engine.dispatch(&noisy, &op)?;
    print_report(op.name(), &report, &clean, psnr(&noisy, &clean)?);

    if args.deconvolve {
        let blurred = engine.apply(clean.clone(), Operation::default_blur())?;
        let report = engine.dispatch(&blurred, &Operation::Deconvolve)?;
        print_report("deconvolution", &report, &clean, psnr(&blurred, &clean)?);
    }

    Ok(())
}
