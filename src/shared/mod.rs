// 共通モジュール

// API通信
pub mod api_client;

// 設定
pub mod config;

// エラー
pub mod errors;

// 入力値の解析・検証ユーティリティ
pub mod utils;

pub use config::{
    get_environment, initialize_logging_system, load_environment_variables, Environment,
    EnvironmentConfig,
};
pub use errors::{AppError, AppResult, ErrorSeverity};
