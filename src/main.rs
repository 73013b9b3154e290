use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use zone_trigger::config::Config;
use zone_trigger::notify::{Notification, SinkSet};

/// 送信先テスト用の対話コマンド
#[derive(Parser, Debug)]
#[command(version = env!("GIT_VERSION"), about = "Send test zone notifications to OSC / MIDI")]
struct Args {
    /// 設定ファイル
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.debug { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(level));

    let config = Config::load_or_default(&args.config);

    println!("=== Zone Trigger - Sink Test ===");
    println!("OSC: {} ({})", if config.osc.enabled { config.osc.addr.as_str() } else { "disabled" }, config.osc.address);
    println!("MIDI: {}", if config.midi.enabled { format!("channel {}", config.midi.channel) } else { "disabled".into() });
    println!();
    println!("コマンド:");
    println!("  on i          - ゾーン i を ON");
    println!("  off i         - ゾーン i を OFF");
    println!("  d i ratio     - ゾーン i の強度を送信 (例: d 0 0.5)");
    println!("  t i           - テスト送信 (ON → 強度を少しずつ上げる → OFF)");
    println!("  q             - 終了");
    println!();

    let mut sinks = SinkSet::from_config(&config);
    if sinks.is_empty() {
        log::warn!("no sinks enabled, nothing will be sent");
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "on" | "off" if parts.len() == 2 => {
                let index: usize = parts[1].parse()?;
                let n = Notification::StateChanged { index, is_on: parts[0] == "on" };
                println!("送信: {:?} ({} sinks)", n, sinks.dispatch(&n));
            }
            "d" if parts.len() == 3 => {
                let index: usize = parts[1].parse()?;
                let ratio: f32 = parts[2].parse()?;
                let n = Notification::Intensity { index, ratio: ratio.clamp(0.0, 1.0) };
                println!("送信: {:?} ({} sinks)", n, sinks.dispatch(&n));
            }
            "t" if parts.len() == 2 => {
                let index: usize = parts[1].parse()?;
                println!("テスト送信中...");
                sinks.dispatch(&Notification::StateChanged { index, is_on: true });
                for i in 0..=10 {
                    let ratio = i as f32 * 0.1;
                    sinks.dispatch(&Notification::Intensity { index, ratio });
                    println!("  ratio = {:.1}", ratio);
                    std::thread::sleep(std::time::Duration::from_millis(200));
                }
                sinks.dispatch(&Notification::StateChanged { index, is_on: false });
                println!("テスト完了");
            }
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", input.trim());
            }
        }
    }

    Ok(())
}
