//! ノート送信コントローラー
//!
//! ファイル選択イベントと送信イベントを受け取り、
//! 「ファイル検証 → アップロード → ノート組み立て → 保存 → 画面遷移」を順に進める。
//!
//! アップロードは別タスクで実行し、結果は [`DraftCommand`] としてキューに積まれる。
//! ドラフトを書き換えるのはキューを処理するコントローラーだけで、アップロード
//! タスクはドラフトに直接触れない。結果には開始時のファイル選択の世代が付き、
//! その後に選択が変わっていれば破棄される。送信時に現在のファイルの
//! アップロードがまだ終わっていなければ `UploadPending` を経由し、
//! 領収書なしのまま保存に進む（送信はブロックしない）。

use super::draft::{BillDraft, DraftCommand};
use super::form::{FieldIssue, NewBillForm, SelectedFile};
use super::models::{Bill, Route, SessionUser};
use super::navigation::NavigationGate;
use super::store::BillStore;
use super::validator::{self, FileCheck, REJECTED_FILE_MESSAGE};
use crate::shared::errors::AppError;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

/// コントローラーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    FileChosen,
    Uploading,
    UploadOk,
    UploadFailed,
    /// アップロード完了前に送信された
    UploadPending,
    Submitting,
    SubmitFailed,
    /// 一覧画面へ遷移済み（以降のイベントは処理しない）
    Navigated,
}

/// ファイル変更イベントの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// ファイルダイアログがキャンセルされた
    Cancelled,
    /// 形式が受け付けられず、入力がクリアされた
    Rejected,
    /// アップロードを開始した
    UploadStarted { file_name: String },
    /// 遷移済みのため無視した
    Ignored,
}

/// 送信イベントの結果
#[derive(Debug)]
pub enum SubmitOutcome {
    /// 保存に成功し一覧画面へ遷移した
    Navigated(Bill),
    /// 必須項目の未入力・不正な値のため送信しなかった
    Blocked(Vec<FieldIssue>),
    /// 保存に失敗した（フォームはそのまま残る）
    Failed(AppError),
    /// 遷移済みのため無視した
    Ignored,
}

/// ノート送信コントローラー
pub struct SubmissionController {
    store: Arc<dyn BillStore>,
    navigator: Arc<dyn NavigationGate>,
    draft: BillDraft,
    form: NewBillForm,
    state: SubmissionState,
    transitions: Vec<SubmissionState>,
    commands_tx: mpsc::UnboundedSender<DraftCommand>,
    commands_rx: mpsc::UnboundedReceiver<DraftCommand>,
    uploads_in_flight: usize,
    /// ファイル選択が受理・拒否されるたびに進む
    selection_generation: u64,
    /// 現在選択中のファイルのアップロード結果を待っているか
    awaiting_receipt: bool,
}

impl SubmissionController {
    /// ログイン済みユーザーのメールでドラフトを作成する
    pub fn new(
        user: &SessionUser,
        store: Arc<dyn BillStore>,
        navigator: Arc<dyn NavigationGate>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        info!("新規ノートフォームを初期化しました: email={}", user.email);

        Self {
            store,
            navigator,
            draft: BillDraft::new(user.email.clone()),
            form: NewBillForm::new(),
            state: SubmissionState::Idle,
            transitions: vec![SubmissionState::Idle],
            commands_tx,
            commands_rx,
            uploads_in_flight: 0,
            selection_generation: 0,
            awaiting_receipt: false,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// これまでに通過した状態（初期状態を含む）
    pub fn transitions(&self) -> &[SubmissionState] {
        &self.transitions
    }

    pub fn form(&self) -> &NewBillForm {
        &self.form
    }

    /// テキスト入力の編集用
    pub fn form_mut(&mut self) -> &mut NewBillForm {
        &mut self.form
    }

    pub fn draft(&self) -> &BillDraft {
        &self.draft
    }

    /// 実行中のアップロードがあるか
    pub fn is_upload_in_flight(&self) -> bool {
        self.uploads_in_flight > 0
    }

    /// ファイル入力の変更イベント
    ///
    /// アップロードはバックグラウンドで開始し、完了を待たずに戻る。
    pub fn handle_change_file(&mut self, files: Vec<SelectedFile>) -> FileChange {
        if self.state == SubmissionState::Navigated {
            debug!("遷移済みのためファイル変更を無視しました");
            return FileChange::Ignored;
        }
        self.drain_commands();

        let Some(file) = files.first().cloned() else {
            debug!("ファイル選択がキャンセルされました");
            return FileChange::Cancelled;
        };

        self.transition(SubmissionState::FileChosen);
        // 実行中のアップロードの結果はこれ以降すべて古いものになる
        self.selection_generation += 1;

        match validator::validate(&file.name) {
            FileCheck::Rejected => {
                self.awaiting_receipt = false;
                warn!("受け付けられないファイル形式です: {}", file.name);
                self.form.file_input_mut().clear();
                self.form.error_file_mut().show(REJECTED_FILE_MESSAGE);
                self.draft.clear_file();
                self.transition(SubmissionState::Idle);
                FileChange::Rejected
            }
            FileCheck::Accepted(file_name) => {
                self.form.file_input_mut().select(files);
                self.form.error_file_mut().hide();
                self.awaiting_receipt = true;
                self.spawn_upload(file);
                self.transition(SubmissionState::Uploading);
                FileChange::UploadStarted { file_name }
            }
        }
    }

    /// フォームの送信イベント
    ///
    /// 実行中のアップロードは待たない。保存が成功した場合のみ一覧画面へ遷移する。
    pub async fn handle_submit(&mut self) -> SubmitOutcome {
        if self.state == SubmissionState::Navigated {
            debug!("遷移済みのため送信を無視しました");
            return SubmitOutcome::Ignored;
        }
        self.drain_commands();

        let fields = match self.form.read_fields() {
            Ok(fields) => fields,
            Err(issues) => {
                let ids: Vec<&str> = issues.iter().map(|issue| issue.field.test_id()).collect();
                warn!("入力が不完全なため送信しませんでした: {ids:?}");
                return SubmitOutcome::Blocked(issues);
            }
        };

        let resume_state = self.state;
        if self.awaiting_receipt {
            warn!("領収書のアップロード完了前に送信されました。領収書なしで保存します");
            self.transition(SubmissionState::UploadPending);
        }

        let bill = self.draft.assemble(&fields);
        let id = self.draft.file_key().map(str::to_string);
        self.transition(SubmissionState::Submitting);

        let store = Arc::clone(&self.store);
        match store.update(id.as_deref(), &bill).await {
            Ok(saved) => {
                info!("ノートを保存しました: id={:?}", saved.id);
                self.draft.seal();
                self.form.error_file_mut().hide();
                self.navigator.on_navigate(Route::Bills);
                self.transition(SubmissionState::Navigated);
                SubmitOutcome::Navigated(saved)
            }
            Err(error) => {
                error!("ノートの保存に失敗しました: {error}");
                self.form.error_file_mut().show(error.user_message());
                self.transition(SubmissionState::SubmitFailed);
                // 再送信できるよう送信前と同等の状態に戻す
                self.transition(resume_state);
                SubmitOutcome::Failed(error)
            }
        }
    }

    /// 実行中のアップロードがすべて終わるまで待ち、結果をドラフトに反映する
    pub async fn wait_for_upload(&mut self) {
        while self.uploads_in_flight > 0 {
            match self.commands_rx.recv().await {
                Some(command) => self.apply(command),
                None => break,
            }
        }
    }

    /// キューに届いているアップロード結果を反映する（待たない）
    pub fn drain_commands(&mut self) {
        while let Ok(command) = self.commands_rx.try_recv() {
            self.apply(command);
        }
    }

    fn spawn_upload(&mut self, file: SelectedFile) {
        let store = Arc::clone(&self.store);
        let email = self.draft.email().to_string();
        let report = UploadReport {
            sender: self.commands_tx.clone(),
            generation: self.selection_generation,
            file_name: file.name.clone(),
            sent: false,
        };
        self.uploads_in_flight += 1;

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("非同期ランタイムがないためアップロードできません: {e}");
                report.send(DraftCommand::UploadFailed {
                    generation: self.selection_generation,
                    file_name: file.name,
                    error: AppError::configuration(format!("非同期ランタイムがありません: {e}")),
                });
                return;
            }
        };

        debug!(
            "領収書アップロードタスクを開始します: file_name={}, generation={}",
            file.name, self.selection_generation
        );
        let generation = self.selection_generation;
        handle.spawn(async move {
            let file_name = file.name.clone();
            let command = match store.create(file, email).await {
                Ok(receipt) => DraftCommand::AttachFile {
                    generation,
                    file_url: receipt.file_url,
                    file_key: receipt.key,
                    file_name,
                },
                Err(error) => DraftCommand::UploadFailed {
                    generation,
                    file_name,
                    error,
                },
            };
            report.send(command);
        });
    }

    fn apply(&mut self, command: DraftCommand) {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);

        if command.generation() != self.selection_generation {
            debug!(
                "ファイル選択が変わったため古いアップロード結果を破棄しました: file_name={}, generation={}",
                command.file_name(),
                command.generation()
            );
            return;
        }
        self.awaiting_receipt = false;

        let settled = match command {
            DraftCommand::AttachFile {
                file_url,
                file_key,
                file_name,
                ..
            } => {
                self.draft.attach_file(file_url, file_key, file_name);
                SubmissionState::UploadOk
            }
            DraftCommand::UploadFailed {
                file_name, error, ..
            } => {
                error!("領収書のアップロードに失敗しました: file_name={file_name}, error={error}");
                if !self.draft.is_sealed() {
                    self.form.error_file_mut().show(error.user_message());
                }
                SubmissionState::UploadFailed
            }
        };

        if self.state == SubmissionState::Navigated {
            return;
        }
        self.transition(settled);
    }

    fn transition(&mut self, next: SubmissionState) {
        if self.state != next {
            debug!("状態遷移: {:?} -> {next:?}", self.state);
        }
        self.state = next;
        self.transitions.push(next);
    }
}

/// アップロードタスクの結果をキューへ一度だけ送る
///
/// タスクがパニックやキャンセルで結果を送らずに終わった場合は、
/// 破棄時に失敗として送る（`wait_for_upload` が待ち続けないように）。
struct UploadReport {
    sender: mpsc::UnboundedSender<DraftCommand>,
    generation: u64,
    file_name: String,
    sent: bool,
}

impl UploadReport {
    fn send(mut self, command: DraftCommand) {
        self.sent = true;
        if self.sender.send(command).is_err() {
            debug!("コントローラーが破棄済みのためアップロード結果を破棄しました");
        }
    }
}

impl Drop for UploadReport {
    fn drop(&mut self) {
        if self.sent {
            return;
        }

        error!(
            "アップロードタスクが結果を返さずに終了しました: file_name={}",
            self.file_name
        );
        let _ = self.sender.send(DraftCommand::UploadFailed {
            generation: self.generation,
            file_name: std::mem::take(&mut self.file_name),
            error: AppError::upload(None, "Le téléchargement du justificatif a été interrompu"),
        });
    }
}
