use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use zone_trigger::config::Config;
use zone_trigger::frame::{Frame, BYTES_PER_PIXEL};
use zone_trigger::notify::Notification;
use zone_trigger::pose::{KeypointName, Pose};
use zone_trigger::zone::{CommandOutcome, ZoneCommand, ZoneDraft};
use zone_trigger::ZoneEngine;

/// 合成シーン（固定ポーズ + 左右に動く白い矩形）でゾーン検出を動かす
#[derive(Parser, Debug)]
#[command(version = env!("GIT_VERSION"), about = "Run the zone engine against a synthetic scene")]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 起動時に読み込むゾーン定義 (JSON)
    #[arg(short, long)]
    zones: Option<String>,

    /// 終了時にゾーン定義を標準出力へ書き出す
    #[arg(long)]
    export: bool,

    /// 処理フレーム数 (0 = 無制限)
    #[arg(short, long, default_value = "0")]
    frames: u64,

    #[arg(long, default_value = "30")]
    fps: u32,

    #[arg(long, default_value = "640")]
    width: u32,

    #[arg(long, default_value = "480")]
    height: u32,

    #[arg(short, long)]
    debug: bool,
}

/// 標準入力スレッドからメインループへの要求
enum Input {
    Command(ZoneCommand),
    List,
    Export,
    Quit,
}

const BLOCK_SIZE: u32 = 60;
const BLOCK_PERIOD_SECS: f32 = 2.0;

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.debug { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(level));

    let config = Config::load_or_default(&args.config);
    log::info!(
        "motion threshold {}, count threshold {}, eye distance {}cm",
        config.motion.motion_threshold,
        config.motion.motion_count_threshold,
        config.motion.known_eye_distance_cm
    );

    let mut engine = ZoneEngine::from_config(&config);

    if let Some(path) = &args.zones {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        engine
            .apply(ZoneCommand::Import(text))
            .with_context(|| format!("Failed to import zones from {}", path))?;
    } else if config.zones.seed_default {
        engine.registry_mut().add(ZoneDraft::anchored(KeypointName::LeftEye).offset(5.0, -7.0).size(4.0, 4.0))?;
    }

    let zone_count = Arc::new(AtomicUsize::new(engine.registry().len()));
    let rx = spawn_input_thread(zone_count.clone());

    let (width, height) = (args.width, args.height);
    let pose = synthetic_pose(width, height);
    let mut buffer = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];

    let frame_duration = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    let start = Instant::now();
    let mut fps_timer = Instant::now();
    let mut frame_count = 0u32;
    let mut edges = 0u32;
    let mut processed = 0u64;

    'main: loop {
        let loop_start = Instant::now();

        // ゾーン編集は tick の合間にだけ反映する
        loop {
            match rx.try_recv() {
                Ok(Input::Command(cmd)) => match engine.apply(cmd) {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => println!("エラー: {}", e),
                },
                Ok(Input::List) => print_zones(&engine),
                Ok(Input::Export) => println!("{}", engine.registry().serialize()?),
                Ok(Input::Quit) => break 'main,
                Err(_) => break,
            }
        }
        zone_count.store(engine.registry().len(), Ordering::Release);

        render_scene(&mut buffer, width, height, start.elapsed().as_secs_f32());
        let frame = Frame::new(width, height, &buffer)?;
        let report = engine.tick(std::slice::from_ref(&pose), &frame);
        edges += report
            .notifications
            .iter()
            .filter(|n| matches!(n, Notification::StateChanged { .. }))
            .count() as u32;

        processed += 1;
        frame_count += 1;
        if args.frames > 0 && processed >= args.frames {
            break;
        }

        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let triggered: Vec<String> = engine
                .registry()
                .tracked()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.state.is_triggered())
                .map(|(i, t)| format!("#{}({:.2})", i, t.state.motion_ratio))
                .collect();
            log::info!(
                "FPS: {:.1} | zones {} | edges {} | triggered [{}]",
                frame_count as f32 / elapsed,
                engine.registry().len(),
                edges,
                triggered.join(" ")
            );
            frame_count = 0;
            edges = 0;
            fps_timer = Instant::now();
        }

        if let Some(rest) = frame_duration.checked_sub(loop_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    log::info!("processed {} frames", processed);
    if args.export {
        println!("{}", engine.registry().serialize()?);
    }
    Ok(())
}

/// 目の間隔 33px (3.3cm → 0.1cm/px) の正面立ち姿勢
fn synthetic_pose(width: u32, height: u32) -> Pose {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 3.0;
    Pose::default()
        .with(KeypointName::Nose, cx, cy + 15.0, 0.95)
        .with(KeypointName::LeftEye, cx + 16.5, cy, 0.9)
        .with(KeypointName::RightEye, cx - 16.5, cy, 0.9)
        .with(KeypointName::LeftEar, cx + 40.0, cy + 5.0, 0.7)
        .with(KeypointName::RightEar, cx - 40.0, cy + 5.0, 0.7)
        .with(KeypointName::LeftShoulder, cx + 90.0, cy + 120.0, 0.8)
        .with(KeypointName::RightShoulder, cx - 90.0, cy + 120.0, 0.8)
}

/// 暗い背景の上を白い矩形が左右に往復する
fn render_scene(buffer: &mut [u8], width: u32, height: u32, t: f32) {
    for px in buffer.chunks_mut(BYTES_PER_PIXEL) {
        px.copy_from_slice(&[16, 16, 16, 255]);
    }

    let phase = (t / BLOCK_PERIOD_SECS * std::f32::consts::TAU).sin();
    let span = width.saturating_sub(BLOCK_SIZE) as f32;
    let x0 = ((phase + 1.0) / 2.0 * span) as u32;
    let y0 = (height / 3).saturating_sub(BLOCK_SIZE);

    let stride = width as usize * BYTES_PER_PIXEL;
    for y in y0..(y0 + BLOCK_SIZE).min(height) {
        for x in x0..(x0 + BLOCK_SIZE).min(width) {
            let i = y as usize * stride + x as usize * BYTES_PER_PIXEL;
            buffer[i..i + 3].copy_from_slice(&[240, 240, 240]);
        }
    }
}

fn spawn_input_thread(zone_count: Arc<AtomicUsize>) -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        println!("コマンド: add [keypoint x y w h] | rm id | clear | list | export | q");
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        while let Some(Ok(line)) = lines.next() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            let input = match parts[0] {
                "add" => match parse_draft(&parts[1..]) {
                    Ok(draft) => Input::Command(ZoneCommand::Add(draft)),
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                },
                "rm" if parts.len() == 2 => match parts[1].parse() {
                    Ok(id) => Input::Command(ZoneCommand::Remove(id)),
                    Err(_) => {
                        println!("不正なID: {}", parts[1]);
                        continue;
                    }
                },
                "clear" => {
                    if zone_count.load(Ordering::Acquire) > 0 && !confirm(&mut lines) {
                        println!("キャンセルしました");
                        continue;
                    }
                    Input::Command(ZoneCommand::RemoveAll)
                }
                "list" => Input::List,
                "export" => Input::Export,
                "q" => Input::Quit,
                _ => {
                    println!("不明なコマンド: {}", line.trim());
                    continue;
                }
            };
            if send(&tx, input).is_err() {
                break;
            }
        }
    });
    rx
}

fn send(tx: &Sender<Input>, input: Input) -> Result<()> {
    tx.send(input).map_err(|_| anyhow::anyhow!("engine loop stopped"))
}

fn confirm<I: Iterator<Item = io::Result<String>>>(lines: &mut I) -> bool {
    print!("本当に全ゾーンを削除しますか? [y/N] ");
    let _ = io::stdout().flush();
    matches!(lines.next(), Some(Ok(answer)) if answer.trim().eq_ignore_ascii_case("y"))
}

/// `keypoint x y w h`。省略した項目はデフォルト
fn parse_draft(args: &[&str]) -> Result<ZoneDraft> {
    let mut draft = ZoneDraft::default();
    if let Some(name) = args.first() {
        draft.relative_to = Some(name.parse().map_err(anyhow::Error::msg)?);
    }
    let nums = args
        .iter()
        .skip(1)
        .map(|s| s.parse::<f32>().with_context(|| format!("不正な数値: {}", s)))
        .collect::<Result<Vec<f32>>>()?;
    match nums.as_slice() {
        [] => {}
        [x, y] => draft = draft.offset(*x, *y),
        [x, y, w, h] => draft = draft.offset(*x, *y).size(*w, *h),
        _ => anyhow::bail!("数値は 0, 2, 4 個のいずれか: {} 個", nums.len()),
    }
    Ok(draft)
}

fn print_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Added(z) => println!("追加: zone {} ({})", z.id, z.relative_to),
        CommandOutcome::Removed(z) => println!("削除: zone {}", z.id),
        CommandOutcome::Cleared(n) => println!("{} ゾーンを削除しました", n),
        CommandOutcome::Imported(n) => println!("{} ゾーンを読み込みました", n),
    }
}

fn print_zones(engine: &ZoneEngine) {
    for (i, t) in engine.registry().tracked().iter().enumerate() {
        let z = &t.zone;
        let r = t.state.rect;
        println!(
            "  #{} id={} {} ({:+.1}, {:+.1}) {}x{}cm -> [{}, {}, {}x{}] motion={} {}",
            i, z.id, z.relative_to, z.offset_x, z.offset_y, z.width, z.height,
            r.x, r.y, r.w, r.h, t.state.motion_count,
            if t.state.is_triggered() { "ON" } else { "" }
        );
    }
}
