use std::{path::PathBuf, time::Instant};

use anyhow::{bail, ensure, Context, Result};
use histogram::Histogram;
use pico_args::Arguments;
use visicull::{
    types::DrawCommand, util::frustum::Frustum, CommandBuffer, CpuCuller, CullStats, CullingOptions, CullingTest,
    DistanceFilter, NoFilter, VisibilityFilter,
};
use visicull_routine::{create_iad, read_back, CullingBuffers, GpuCuller};
use visicull_test::{visible_set, Scene, SceneBuilder};
use wgpu::Backend;

const HELP: &str = "\
cull-bench

Culls a seeded random scene with visicull and reports how long it took.

usage: cull-bench --options

Meta:
  --help                   This menu.

Scene:
  -n --objects <count>     Number of candidate objects. Default 100000.
  --visible <fraction>     Fraction of objects placed inside the frustum. Default 0.5.
  --seed <seed>            Seed of the scene generator. Default 0.

Culling:
  --config <file.json>     Load culling options from a json file. Flags below override it.
  -c --capacity <count>    Slots in the command buffer. Defaults to the object count.
  --sequential             Cull on a single thread.
  --sphere                 Test bounding spheres instead of boxes.
  --max-distance <value>   Cull objects further than this from the camera.
  -i --iterations <count>  Number of timed passes. Default 100.

Gpu:
  --gpu                    Also run the pass on the gpu and check it against the cpu.
  -b --backend             Choose backend to run on ('vk', 'dx12', 'metal').
  -d --device              Choose device to run on (case insensitive device substring).
";

fn extract_backend(value: &str) -> Result<Backend, &'static str> {
    Ok(match value.to_lowercase().as_str() {
        "vulkan" | "vk" => Backend::Vulkan,
        "dx12" | "12" => Backend::Dx12,
        "metal" | "mtl" => Backend::Metal,
        _ => return Err("unknown backend"),
    })
}

fn extract_fraction(value: &str) -> Result<f32, &'static str> {
    match value.parse::<f32>() {
        Ok(fraction) if (0.0..=1.0).contains(&fraction) => Ok(fraction),
        _ => Err("fraction must be between 0 and 1"),
    }
}

fn extract_distance(value: &str) -> Result<f32, &'static str> {
    match value.parse::<f32>() {
        Ok(distance) if distance.is_finite() && distance >= 0.0 => Ok(distance),
        _ => Err("distance must be a finite, non-negative number"),
    }
}

fn option_arg<T>(result: Result<Option<T>, pico_args::Error>) -> Option<T> {
    match result {
        Ok(o) => o,
        Err(pico_args::Error::Utf8ArgumentParsingFailed { value, cause }) => {
            eprintln!("{}: '{}'\n\n{}", cause, value, HELP);
            std::process::exit(1);
        }
        Err(pico_args::Error::OptionWithoutAValue(value)) => {
            eprintln!("{} flag needs an argument", value);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{:?}", e);
            std::process::exit(1);
        }
    }
}

struct BenchArgs {
    objects: usize,
    visible_fraction: f32,
    seed: u64,
    iterations: usize,
    options: CullingOptions,
    max_distance: Option<f32>,
    gpu: bool,
    desired_backend: Option<Backend>,
    desired_device_name: Option<String>,
}

impl BenchArgs {
    fn from_args() -> Result<Self> {
        let mut args = Arguments::from_env();

        // Meta
        let help = args.contains(["-h", "--help"]);

        // Scene
        let objects = option_arg(args.opt_value_from_str(["-n", "--objects"])).unwrap_or(100_000);
        let visible_fraction = option_arg(args.opt_value_from_fn("--visible", extract_fraction)).unwrap_or(0.5);
        let seed = option_arg(args.opt_value_from_str("--seed")).unwrap_or(0);

        // Culling
        let mut options = match option_arg(args.opt_value_from_str::<_, PathBuf>("--config")) {
            Some(path) => CullingOptions::from_json_file(&path)
                .with_context(|| format!("Failed to load culling options from {}", path.display()))?,
            None => CullingOptions::default(),
        };
        if let Some(capacity) = option_arg(args.opt_value_from_str(["-c", "--capacity"])) {
            options.command_capacity = Some(capacity);
        }
        if args.contains("--sequential") {
            options.parallel = false;
        }
        if args.contains("--sphere") {
            options.test = CullingTest::Sphere;
        }
        let max_distance = option_arg(args.opt_value_from_fn("--max-distance", extract_distance));
        options.validate().context("Invalid culling options")?;
        let iterations = option_arg(args.opt_value_from_str(["-i", "--iterations"])).unwrap_or(100);

        // Gpu
        let gpu = args.contains("--gpu");
        let desired_backend = option_arg(args.opt_value_from_fn(["-b", "--backend"], extract_backend));
        let desired_device_name: Option<String> =
            option_arg(args.opt_value_from_str(["-d", "--device"])).map(|s: String| s.to_lowercase());

        let remaining = args.finish();

        if !remaining.is_empty() {
            eprint!("Unknown arguments:");
            for flag in remaining {
                eprint!(" '{}'", flag.to_string_lossy());
            }
            eprintln!("\n");

            eprintln!("{}", HELP);
            std::process::exit(1);
        }

        if help {
            eprintln!("{}", HELP);
            std::process::exit(1);
        }

        Ok(Self {
            objects,
            visible_fraction,
            seed,
            iterations: iterations.max(1),
            options,
            max_distance,
            gpu,
            desired_backend,
            desired_device_name,
        })
    }
}

fn print_times(label: &str, times: &Histogram) {
    println!(
        "{}: {:0>5} passes. Min: {:0>5.3}ms; Average: {:0>5.3}ms; 95%: {:0>5.3}ms; 99%: {:0>5.3}ms; Max: {:0>5.3}ms; StdDev: {:0>5.3}ms",
        label,
        times.entries(),
        times.minimum().unwrap_or(0) as f32 / 1_000.0,
        times.mean().unwrap_or(0) as f32 / 1_000.0,
        times.percentile(95.0).unwrap_or(0) as f32 / 1_000.0,
        times.percentile(99.0).unwrap_or(0) as f32 / 1_000.0,
        times.maximum().unwrap_or(0) as f32 / 1_000.0,
        times.stddev().unwrap_or(0) as f32 / 1_000.0,
    );
}

fn record_time(times: &mut Histogram, start: Instant) {
    if let Err(e) = times.increment(start.elapsed().as_micros() as u64) {
        log::warn!("Dropped timing sample: {}", e);
    }
}

fn run_cpu<F: VisibilityFilter>(
    args: &BenchArgs,
    scene: &Scene,
    frustum: &Frustum,
    filter: &F,
) -> Result<(Vec<DrawCommand>, CullStats)> {
    let culler = CpuCuller::new(args.options.clone());
    let capacity = args.options.capacity_for(scene.objects.len());
    let mut output = CommandBuffer::new(capacity).context("Failed to allocate command buffer")?;

    let mut times = Histogram::new();
    let mut stats = CullStats::default();
    for _ in 0..args.iterations {
        profiling::scope!("Bench Iteration");
        output.clear();
        let start = Instant::now();
        stats = culler.cull_with_filter(&scene.objects, frustum, filter, &output);
        record_time(&mut times, start);
    }
    print_times("cpu", &times);

    Ok((output.commands(), stats))
}

fn run_gpu(args: &BenchArgs, scene: &Scene, frustum: &Frustum, cpu_commands: &[DrawCommand]) -> Result<()> {
    let iad = pollster::block_on(create_iad(args.desired_backend, args.desired_device_name.clone()))
        .context("InstanceAdapterDevice creation failed")?;
    println!("gpu adapter: {} ({:?})", iad.info.name, iad.info.backend);

    let capacity = args.options.capacity_for(scene.objects.len());
    let culler =
        pollster::block_on(GpuCuller::new(&iad.device)).context("Failed to build the culling pipeline")?;
    let mut buffers = CullingBuffers::new(&iad.device, scene.objects.len().max(1), capacity)
        .context("Failed to create culling buffers")?;
    buffers
        .upload(&iad.queue, &scene.objects, frustum)
        .context("Failed to upload objects")?;

    let mut times = Histogram::new();
    let mut readback = None;
    for _ in 0..args.iterations {
        profiling::scope!("Bench Iteration");
        let start = Instant::now();
        let mut encoder = iad.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cull-bench encoder"),
        });
        culler.cull(&iad.device, &mut encoder, &buffers);
        iad.queue.submit(Some(encoder.finish()));
        readback = Some(
            pollster::block_on(read_back(&iad.device, &iad.queue, &buffers))
                .context("Failed to read back culling results")?,
        );
        record_time(&mut times, start);
    }
    print_times("gpu (with readback)", &times);

    let Some(readback) = readback else {
        bail!("No gpu pass was run");
    };
    println!("gpu visible: {}", readback.count);

    if args.options.test != CullingTest::Aabb || args.max_distance.is_some() {
        log::warn!("The gpu pass only runs the plain box test, skipping the cross-check");
        return Ok(());
    }

    let gpu_set = visible_set(&readback.commands);
    let cpu_set = visible_set(cpu_commands);
    if cpu_set.len() < capacity {
        ensure!(
            gpu_set == cpu_set,
            "gpu and cpu visible sets differ: {} vs {} objects",
            gpu_set.len(),
            cpu_set.len()
        );
    } else {
        // Both passes were clamped, which objects made it in is unordered.
        ensure!(
            gpu_set.len() == cpu_set.len(),
            "gpu wrote {} commands, cpu wrote {}",
            gpu_set.len(),
            cpu_set.len()
        );
        ensure!(
            gpu_set.windows(2).all(|pair| pair[0] != pair[1]),
            "gpu wrote an object twice"
        );
    }
    println!("gpu and cpu agree");

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = BenchArgs::from_args()?;

    let visible = (args.objects as f64 * args.visible_fraction as f64).round() as usize;
    let scene = SceneBuilder::new(args.seed)
        .inside(visible)
        .behind(args.objects - visible)
        .shuffled()
        .build();
    let frustum = scene.frustum();
    log::info!(
        "Generated {} objects, {} in view, with options {:?}",
        scene.objects.len(),
        visible,
        args.options
    );

    let (commands, stats) = match args.max_distance {
        Some(max_distance) => {
            let filter = DistanceFilter {
                origin: scene.camera.location(),
                max_distance,
            };
            run_cpu(&args, &scene, &frustum, &filter)?
        }
        None => run_cpu(&args, &scene, &frustum, &NoFilter)?,
    };
    println!(
        "cpu candidates: {}; visible: {}; written: {}; dropped: {}",
        stats.candidates, stats.visible, stats.written, stats.dropped
    );

    if args.gpu {
        run_gpu(&args, &scene, &frustum, &commands)?;
    }

    Ok(())
}
