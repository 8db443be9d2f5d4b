//! Extractor track planner: sweeps an ERP tile grid and prints the packed viewports.
//!
//! Uses the approximate grid geometry, so tile-sets are indicative only.
//!
//! Usage:
//!   extractor-plan [options]
//!
//! Options:
//!   --width <px>            High resolution picture width (default: 3840)
//!   --height <px>           High resolution picture height (default: 1920)
//!   --rows <n>              High resolution tile rows (default: 2)
//!   --cols <n>              High resolution tile columns (default: 4)
//!   --low-width <px>        Low resolution picture width (default: 1920)
//!   --low-height <px>       Low resolution picture height (default: 960)
//!   --low-rows <n>          Low resolution tile rows (default: 1)
//!   --low-cols <n>          Low resolution tile columns (default: 2)
//!   --single                Plan a single stream with SingleVideoPacking
//!   --strategy <name>       Packing strategy (default: HighResPlusFullLowResPacking)
//!   --yaw <deg>             Initial viewport yaw (default: 90)
//!   --pitch <deg>           Initial viewport pitch (default: 0)
//!   --fov <h> <v>           Viewport field of view (default: 80 90)
//!   --refine <n>            Tile-set count above which pruning runs (default: 100)
//!   --json                  Print the plan as JSON (requires the `json` feature)

use anyhow::{bail, Context, Result};
use omaf_extractor::{
    ErpGridOracle, ExtractorConfig, ExtractorTrackGenerator, GenerationPlan,
    HighResPlusFullLowResPacking, MediaStream, SingleVideoPacking, StrategyRegistry, StreamMap,
    VideoStream,
};

struct Grid {
    width: u32,
    height: u32,
    rows: u16,
    cols: u16,
}

struct Args {
    high: Grid,
    low: Grid,
    single: bool,
    strategy: Option<String>,
    yaw: f32,
    pitch: f32,
    fov: (f32, f32),
    refine: usize,
    json: bool,
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        high: Grid {
            width: 3840,
            height: 1920,
            rows: 2,
            cols: 4,
        },
        low: Grid {
            width: 1920,
            height: 960,
            rows: 1,
            cols: 2,
        },
        single: false,
        strategy: None,
        yaw: 90.0,
        pitch: 0.0,
        fov: (80.0, 90.0),
        refine: 100,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--width" => parsed.high.width = value(&args, i, flag)?.parse()?,
            "--height" => parsed.high.height = value(&args, i, flag)?.parse()?,
            "--rows" => parsed.high.rows = value(&args, i, flag)?.parse()?,
            "--cols" => parsed.high.cols = value(&args, i, flag)?.parse()?,
            "--low-width" => parsed.low.width = value(&args, i, flag)?.parse()?,
            "--low-height" => parsed.low.height = value(&args, i, flag)?.parse()?,
            "--low-rows" => parsed.low.rows = value(&args, i, flag)?.parse()?,
            "--low-cols" => parsed.low.cols = value(&args, i, flag)?.parse()?,
            "--strategy" => parsed.strategy = Some(value(&args, i, flag)?.to_string()),
            "--yaw" => parsed.yaw = value(&args, i, flag)?.parse()?,
            "--pitch" => parsed.pitch = value(&args, i, flag)?.parse()?,
            "--refine" => parsed.refine = value(&args, i, flag)?.parse()?,
            "--fov" => {
                let h = value(&args, i, flag)?.parse()?;
                let v = value(&args, i + 1, flag)?.parse()?;
                parsed.fov = (h, v);
                i += 1;
            }
            "--single" => {
                parsed.single = true;
                i += 1;
                continue;
            }
            "--json" => {
                parsed.json = true;
                i += 1;
                continue;
            }
            other => bail!("unknown option: {}", other),
        }
        i += 2;
    }
    Ok(parsed)
}

fn streams(args: &Args) -> Result<StreamMap> {
    let mut streams = StreamMap::new();
    let high = &args.high;
    // Bitrates only rank the streams.
    streams.insert(
        0,
        MediaStream::Video(VideoStream::erp(high.width, high.height, high.rows, high.cols, 2)?),
    );
    if !args.single {
        let low = &args.low;
        streams.insert(
            1,
            MediaStream::Video(VideoStream::erp(low.width, low.height, low.rows, low.cols, 1)?),
        );
    }
    Ok(streams)
}

fn print_plan(plan: &GenerationPlan) {
    println!(
        "{} viewports from an initial selection of {} tiles",
        plan.viewports.len(),
        plan.initial_selection
    );
    for viewport in &plan.viewports {
        let size = viewport.packed_pic_size();
        let tiles: Vec<String> = viewport.tiles.iter().map(|t| t.idx.to_string()).collect();
        println!(
            "  viewport {:>3}: {:>2} tiles [{}] -> {}x{}, {} regions, {} tile columns",
            viewport.viewport_id,
            viewport.tiles.len(),
            tiles.join(","),
            size.width,
            size.height,
            viewport.dst_rwpk.num_regions(),
            viewport.arrange.cols()
        );
    }
}

#[cfg(feature = "json")]
fn print_json(plan: &GenerationPlan) -> Result<()> {
    let viewports: Vec<serde_json::Value> = plan
        .viewports
        .iter()
        .map(|v| {
            let region = v.coverage.sphere_regions.first();
            serde_json::json!({
                "viewport_id": v.viewport_id,
                "tiles": v.tiles.iter().map(|t| t.idx).collect::<Vec<_>>(),
                "packed_width": v.dst_rwpk.packed_pic_width,
                "packed_height": v.dst_rwpk.packed_pic_height,
                "regions": v.dst_rwpk.num_regions(),
                "tile_col_widths": v.arrange.tile_col_widths,
                "centre_azimuth": region.map(|r| r.centre_azimuth),
                "centre_elevation": region.map(|r| r.centre_elevation),
            })
        })
        .collect();
    let doc = serde_json::json!({
        "ranked_streams": plan.ranked_streams,
        "initial_selection": plan.initial_selection,
        "viewports": viewports,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

#[cfg(not(feature = "json"))]
fn print_json(_plan: &GenerationPlan) -> Result<()> {
    bail!("extractor-plan was built without the `json` feature")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("omaf_extractor=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .init();

    let args = parse_args()?;
    let streams = streams(&args)?;
    let strategy = args.strategy.clone().unwrap_or_else(|| {
        if args.single {
            SingleVideoPacking::NAME.to_string()
        } else {
            HighResPlusFullLowResPacking::NAME.to_string()
        }
    });

    let config = ExtractorConfig::new(streams.len() as u8)
        .packing_strategy(strategy)
        .pose(args.yaw, args.pitch)
        .fov(args.fov.0, args.fov.1)
        .refine_threshold(args.refine);
    let registry = StrategyRegistry::with_builtin();
    let plan = ExtractorTrackGenerator::new(&config, &registry)
        .plan(&streams, &mut ErpGridOracle::new())
        .context("planning extractor tracks")?;

    if args.json {
        print_json(&plan)
    } else {
        print_plan(&plan);
        Ok(())
    }
}
