// ==========================================
// PV 配置快照管理 - 命令行入口
// ==========================================
// 用法:
//   pv-config-manager list [config_type]
//   pv-config-manager show <id>
//   pv-config-manager export <id> <file.csv>
//   pv-config-manager import <file.csv> <name> <config_type>
//   pv-config-manager delete <id>
// 数据库: 环境变量 PV_CONFIG_DB_PATH > 用户数据目录 > 当前目录
// ==========================================

use std::error::Error;
use std::process::ExitCode;

use pv_config_manager::db::default_db_path;
use pv_config_manager::domain::Configuration;
use pv_config_manager::logging;
use pv_config_manager::service::{ConfigServiceClient, ConfigurationFilter, SqliteConfigService};
use pv_config_manager::transfer::{export_csv, import_csv};

const USAGE: &str = "用法:
  pv-config-manager list [config_type]
  pv-config-manager show <id>
  pv-config-manager export <id> <file.csv>
  pv-config-manager import <file.csv> <name> <config_type>
  pv-config-manager delete <id>";

fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "命令执行失败");
            eprintln!("错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let db_path = default_db_path();
    tracing::info!("{} v{} 使用数据库: {}", pv_config_manager::APP_NAME, pv_config_manager::VERSION, db_path);
    let service = SqliteConfigService::new(&db_path)?;

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["list"] => list(&service, ConfigurationFilter::default()),
        ["list", config_type] => list(&service, ConfigurationFilter::by_type(*config_type)),
        ["show", id] => {
            let stored = service.get_pv_configuration_by_id(id)?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
            Ok(())
        }
        ["export", id, file] => {
            let config = Configuration::load(&service, id)?
                .ok_or_else(|| format!("配置未找到: id={}", id))?;
            let rows = export_csv(&config, &[], file)?;
            println!("已导出 {} 行到 {}", rows, file);
            Ok(())
        }
        ["import", file, name, config_type] => {
            let mut config = import_csv(file, name, config_type)?;
            config.save(&service)?;
            println!("{}", config.id().unwrap_or_default());
            Ok(())
        }
        ["delete", id] => {
            Configuration::delete(&service, id)?;
            println!("已删除: {}", id);
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            Err("参数无效".into())
        }
    }
}

fn list(service: &SqliteConfigService, filter: ConfigurationFilter) -> Result<(), Box<dyn Error>> {
    let summaries = service.get_pv_configurations(&filter)?;
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
