use clap::{Arg, ArgAction, Command};
use tracing::{debug, info};

use lprisk::aggregator::{RiskAggregator, RiskReport};
use lprisk::logging::{LogConfig, LogOutput, init_logging, level_from_verbosity, parse_log_level};
use lprisk::scenario::ScenarioConfig;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("lprisk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("雷保護リスク評価 (Lightning protection risk assessment)")
        .long_about("IEC 62305-2 に基づき、構造物の人命損失リスク R1 を評価します。\n\
                     シナリオファイル(.yaml)に構造物、ゾーン、引込線、保護設備を記述します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .required(true)
                .help("シナリオファイル(.yaml)のパスを指定")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("json")
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("評価結果をJSONで出力")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)。-v より優先")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");
    let level = matches
        .get_one::<String>("log-level")
        .map(|s| parse_log_level(s))
        .unwrap_or_else(|| level_from_verbosity(verbose_level));
    let output = matches
        .get_one::<LogOutput>("log-output")
        .copied()
        .unwrap_or(LogOutput::Console);

    let _guard = match init_logging(LogConfig { level, output, ..LogConfig::default() }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    let Some(scenario_path) = matches.get_one::<String>("scenario") else {
        return;
    };

    if let Err(e) = run_scenario(scenario_path, matches.get_flag("info"), matches.get_flag("json")) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオファイルを読み込んで評価
fn run_scenario(scenario_path: &str, info_only: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;
    info!("シナリオファイル読み込み完了: {}", scenario_path);

    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    let structure = scenario.build_structure()?;
    let density = scenario.ground_flash_density()?;
    debug!(
        zones = structure.zones.len(),
        lines = structure.lines.len(),
        density,
        "モデル構築完了"
    );

    let report = RiskAggregator::new(&structure, density)
        .include_line_risks(scenario.assessment.include_line_risks)
        .evaluate()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// 評価結果を表示
fn print_report(report: &RiskReport) {
    println!("=== 評価結果 ===");
    println!("構造物: {}", report.structure);
    println!("ND: {:.3e} /年", report.nd);
    println!("NM: {:.3e} /年", report.nm);
    println!();

    for zone in &report.zones {
        println!("ゾーン {}:", zone.zone);
        println!("  RA: {:.3e}  RB: {:.3e}", zone.ra, zone.rb);
        println!("  RU: {:.3e}  RV: {:.3e}", zone.ru, zone.rv);
        println!("  RW: {:.3e}  RZ: {:.3e}", zone.rw, zone.rz);
        println!("  小計: {:.3e}", zone.total());
    }
    println!();

    let status = if report.is_safe { "適合" } else { "不適合 - 保護対策が必要" };
    println!("総リスク R1: {:.3e}", report.total_r1);
    println!("許容リスク RT: {:.3e}", report.tolerable_risk);
    println!("判定: {}", status);
}
