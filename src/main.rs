use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use signal_mapper::{
    ColumnNames, DataLoader, OutputWriter, Period, RetentionPolicy, ServerSettings, Settings,
    SignalPipeline, SplitSettings,
};

/// Build Modbus emulator configs from a signal inventory
///
/// Every option can also be set through the environment variable of the
/// same upper-case name, or a `.env` file in the working directory.
#[derive(Debug, Parser)]
#[command(name = "signal-mapper", version, about)]
struct Cli {
    /// Workbook directory under the input dir (holds signals.csv and devices.csv)
    #[arg(long, env = "LIST_OF_SIGNALS_NAME")]
    list_of_signals_name: String,

    #[arg(long, env = "INPUT_FILES_DIR", default_value = "input_files")]
    input_files_dir: PathBuf,

    #[arg(long, env = "OUTPUT_FILES_DIR", default_value = "output_files")]
    output_files_dir: PathBuf,

    /// One config JSON per asset
    #[arg(
        long,
        env = "DIVIDE_CONFIG_BY_ASSET",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    divide_config_by_asset: bool,

    /// One data template per asset
    #[arg(
        long,
        env = "DIVIDE_DATA_BY_ASSET",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    divide_data_by_asset: bool,

    #[arg(long, env = "EXCEL_DATA_NAME", default_value = "data")]
    excel_data_name: String,

    #[arg(long, env = "DATA_FILE_EXTENSION", default_value = "csv")]
    data_file_extension: String,

    #[arg(long, env = "JSON_CONFIG_NAME", default_value = "config")]
    json_config_name: String,

    #[arg(long, env = "SIGNALS_SHEET", default_value = "signals")]
    signals_sheet: String,

    #[arg(long, env = "DEVICES_SHEET", default_value = "devices")]
    devices_sheet: String,

    // Column names
    #[arg(long, env = "SIGNALS_SHEET_DEVICE_COLUMN", default_value = "device")]
    signals_sheet_device_column: String,

    #[arg(long, env = "CODE_COLUMN", default_value = "code")]
    code_column: String,

    #[arg(long, env = "SIGNAL_TYPE_COLUMN", default_value = "signal_type")]
    signal_type_column: String,

    #[arg(long, env = "ADDRESS_COLUMN", default_value = "address")]
    address_column: String,

    #[arg(long, env = "VALUE_TYPE_COLUMN", default_value = "value_type")]
    value_type_column: String,

    #[arg(long, env = "ASSET_COLUMN", default_value = "asset")]
    asset_column: String,

    #[arg(long, env = "GATEWAY_COLUMN", default_value = "gateway")]
    gateway_column: String,

    #[arg(long, env = "DEVICES_SHEET_DEVICE_COLUMN", default_value = "code")]
    devices_sheet_device_column: String,

    #[arg(long, env = "COMMON_ADDRESS_COLUMN", default_value = "common_address")]
    common_address_column: String,

    /// Signal type that gets emulated
    #[arg(long, env = "ONLY_SIGNALS_TYPE", default_value = "Сигнал")]
    only_signals_type: String,

    #[arg(long, env = "DEFAULT_VALUE_TYPE", default_value = "hfloat")]
    default_value_type: String,

    /// Subset name for signals without an asset
    #[arg(long, env = "UNASSIGNED_ASSET", default_value = "no_asset")]
    unassigned_asset: String,

    /// Which row survives for a repeated code: first or last
    #[arg(long, env = "DUPLICATE_RETENTION", default_value = "last")]
    duplicate_retention: RetentionPolicy,

    // Emulator server
    #[arg(long, env = "SERVER_NAME", default_value = "Test")]
    server_name: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 502)]
    port: u16,

    #[arg(long, env = "HOURS", default_value_t = 0)]
    hours: u32,

    #[arg(long, env = "MINUTES", default_value_t = 10)]
    minutes: u32,

    #[arg(long, env = "SECONDS", default_value_t = 0)]
    seconds: u32,

    /// Log level (DEBUG, INFO, WARNING, ERROR)
    #[arg(long, env = "LOGGING_LEVEL", default_value = "INFO")]
    logging_level: String,
}

impl Cli {
    fn log_level(&self) -> Level {
        match self.logging_level.trim().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" | "critical" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn into_settings(self) -> Settings {
        Settings {
            input_dir: self.input_files_dir,
            output_dir: self.output_files_dir,
            list_of_signals_name: self.list_of_signals_name,
            signals_sheet: self.signals_sheet,
            devices_sheet: self.devices_sheet,
            data_file_name: self.excel_data_name,
            data_file_extension: self.data_file_extension,
            config_file_name: self.json_config_name,
            columns: ColumnNames {
                device: self.signals_sheet_device_column,
                code: self.code_column,
                signal_type: self.signal_type_column,
                address: self.address_column,
                value_type: self.value_type_column,
                asset: self.asset_column,
                gateway: self.gateway_column,
                device_key: self.devices_sheet_device_column,
                common_address: self.common_address_column,
            },
            target_signal_type: self.only_signals_type,
            default_value_type: self.default_value_type,
            unassigned_asset: self.unassigned_asset,
            split: SplitSettings {
                config_by_asset: self.divide_config_by_asset,
                data_by_asset: self.divide_data_by_asset,
            },
            retention: self.duplicate_retention,
            server: ServerSettings {
                name: self.server_name,
                host: self.host,
                port: self.port,
                period: Period::new(self.hours, self.minutes, self.seconds),
            },
        }
    }
}

fn init_logging(level: Level) {
    let filter = EnvFilter::new(level.as_str().to_lowercase());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    // .env never overrides variables already set
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level());
    let settings = cli.into_settings();

    match run(&settings) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            error!("{} asset subset(s) failed; their files were not written", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load, resolve, map and write; returns the number of failed subsets
fn run(settings: &Settings) -> Result<usize> {
    info!("Reading workbook {}", settings.workbook_dir().display());

    let loader = DataLoader::new(settings);
    let signals = loader.load_signals(&settings.signals_file())?;
    let devices = loader.load_devices(&settings.devices_file())?;

    let output = SignalPipeline::new(settings).run(&signals, &devices);

    let failed = OutputWriter::new(settings).write_outcomes(&output.outcomes);

    info!("{}", output.report.summary());
    Ok(failed)
}
