// 機能モジュール構造
pub mod features;
pub mod shared;

use features::bills::{HttpBillStore, NavigationGate, SessionUser, SubmissionController};
use log::info;
use shared::config::environment::{initialize_logging_system, load_environment_variables};
use shared::errors::{AppError, AppResult};
use std::sync::Arc;

/// 環境変数とログシステムを初期化する
pub fn initialize() {
    load_environment_variables();
    initialize_logging_system();
    info!("ノート作成コアを初期化しました");
}

/// セッションストアの `user` エントリから新規ノートフォームを作成する
///
/// ストアは環境変数（`BILLS_API_URL` など）の設定で接続する。
pub fn new_bill_controller(
    session_user_json: &str,
    navigator: Arc<dyn NavigationGate>,
) -> AppResult<SubmissionController> {
    let user = SessionUser::from_session_json(session_user_json).map_err(AppError::from)?;
    let store = HttpBillStore::from_env()?;

    Ok(SubmissionController::new(&user, Arc::new(store), navigator))
}
