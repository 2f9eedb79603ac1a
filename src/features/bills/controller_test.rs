// 送信コントローラーのテスト
//
// ストアとナビゲーターはメモリ上のモックに置き換える。

use super::controller::{FileChange, SubmissionController, SubmissionState, SubmitOutcome};
use super::error_page::render_error_page;
use super::form::{FormField, SelectedFile, FORM_TITLE};
use super::models::{Bill, BillStatus, ExpenseType, Route, SessionUser, UploadedReceipt};
use super::navigation::NavigationGate;
use super::store::BillStore;
use super::validator::REJECTED_FILE_MESSAGE;
use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// 呼び出しを記録するモックストア
#[derive(Default)]
struct MockStore {
    /// Some の場合、create はこのステータスで失敗する
    upload_failure: Option<u16>,
    /// 指定したファイルの create は通知されるまで完了しない
    upload_gate: Option<(&'static str, Arc<Notify>)>,
    /// create の途中でパニックする
    panic_on_upload: bool,
    persist_failures: Mutex<VecDeque<AppError>>,
    creates: Mutex<Vec<(String, String)>>,
    updates: Mutex<Vec<(Option<String>, Bill)>>,
}

impl MockStore {
    fn failing_persist(error: AppError) -> Self {
        let store = Self::default();
        store.persist_failures.lock().unwrap().push_back(error);
        store
    }

    fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    fn updates(&self) -> Vec<(Option<String>, Bill)> {
        self.updates.lock().unwrap().clone()
    }
}

impl BillStore for MockStore {
    fn create(&self, file: SelectedFile, email: String) -> BoxFuture<'_, AppResult<UploadedReceipt>> {
        Box::pin(async move {
            self.creates.lock().unwrap().push((file.name.clone(), email));

            if self.panic_on_upload {
                panic!("アップロードタスクの異常終了");
            }
            if let Some((gated_file, gate)) = &self.upload_gate {
                if *gated_file == file.name {
                    gate.notified().await;
                }
            }

            match self.upload_failure {
                Some(status) => Err(AppError::upload(Some(status), "Internal Server Error")),
                None => Ok(UploadedReceipt {
                    file_url: format!("https://localhost:3456/images/{}", file.name),
                    key: format!("key-{}", file.name),
                }),
            }
        })
    }

    fn update<'a>(&'a self, id: Option<&'a str>, bill: &'a Bill) -> BoxFuture<'a, AppResult<Bill>> {
        Box::pin(async move {
            self.updates
                .lock()
                .unwrap()
                .push((id.map(str::to_string), bill.clone()));

            match self.persist_failures.lock().unwrap().pop_front() {
                Some(error) => Err(error),
                // 受け取ったレコードをそのまま返す
                None => Ok(bill.clone()),
            }
        })
    }
}

/// 遷移先を記録するナビゲーター
#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl NavigationGate for RecordingNavigator {
    fn on_navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

fn controller_with(
    store: MockStore,
) -> (SubmissionController, Arc<MockStore>, Arc<RecordingNavigator>) {
    let store = Arc::new(store);
    let navigator = Arc::new(RecordingNavigator::default());
    let controller = SubmissionController::new(
        &SessionUser::employee("a@a"),
        store.clone(),
        navigator.clone(),
    );
    (controller, store, navigator)
}

fn image(name: &str, media_type: &str) -> SelectedFile {
    SelectedFile::new(name, media_type, name.as_bytes().to_vec())
}

/// 完了済みのアップロードタスクを走らせ、届いた結果を反映する
async fn settle_finished_uploads(controller: &mut SubmissionController) {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    controller.drain_commands();
}

fn fill_transports_form(controller: &mut SubmissionController) {
    controller
        .form_mut()
        .set(FormField::ExpenseType, "Transports")
        .set(FormField::ExpenseName, "Billet train Lille Paris")
        .set(FormField::Date, "2021-01-21")
        .set(FormField::Amount, "50")
        .set(FormField::Vat, "10")
        .set(FormField::Pct, "5");
}

fn expected_transports_bill(file_url: Option<&str>, file_name: Option<&str>) -> Bill {
    Bill {
        id: None,
        email: "a@a".to_string(),
        expense_type: ExpenseType::Transports,
        name: "Billet train Lille Paris".to_string(),
        date: NaiveDate::from_ymd_opt(2021, 1, 21).unwrap(),
        amount: 50,
        vat: Some(10.0),
        pct: 5,
        commentary: None,
        file_url: file_url.map(str::to_string),
        file_name: file_name.map(str::to_string),
        status: BillStatus::Pending,
    }
}

#[test]
fn test_form_required_inputs() {
    let (controller, _, _) = controller_with(MockStore::default());
    let form = controller.form();

    assert_eq!(form.title(), FORM_TITLE);
    for field in [
        FormField::ExpenseType,
        FormField::Date,
        FormField::Amount,
        FormField::Pct,
        FormField::File,
    ] {
        assert!(field.is_required(), "{} should be required", field.test_id());
    }
}

#[tokio::test]
async fn test_pdf_file_is_rejected_and_input_cleared() {
    let (mut controller, store, _) = controller_with(MockStore::default());

    let change = controller.handle_change_file(vec![image("file.pdf", "application/pdf")]);

    assert_eq!(change, FileChange::Rejected);
    assert_eq!(controller.form().file_input().value(), "");
    assert!(controller.form().file_input().is_empty());
    assert_eq!(
        controller.form().error_file().text(),
        Some(REJECTED_FILE_MESSAGE)
    );
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert!(!controller.draft().has_file());

    // ネットワーク呼び出しは行わない
    tokio::task::yield_now().await;
    assert_eq!(store.create_count(), 0);
    assert!(!controller.is_upload_in_flight());
}

#[tokio::test]
async fn test_exe_file_is_rejected() {
    let (mut controller, store, _) = controller_with(MockStore::default());

    let change = controller.handle_change_file(vec![image("image.exe", "image/exe")]);

    assert_eq!(change, FileChange::Rejected);
    assert_eq!(controller.form().file_input().value(), "");
    assert_eq!(store.create_count(), 0);
    assert_eq!(controller.form().title(), FORM_TITLE);
}

#[tokio::test]
async fn test_jpg_file_is_accepted_and_uploaded() {
    let (mut controller, store, _) = controller_with(MockStore::default());

    let change = controller.handle_change_file(vec![image("image.jpg", "image/jpg")]);

    assert_eq!(
        change,
        FileChange::UploadStarted {
            file_name: "image.jpg".to_string()
        }
    );
    assert_eq!(controller.form().file_input().files().len(), 1);
    assert_eq!(controller.form().file_input().files()[0].name, "image.jpg");
    assert_eq!(controller.state(), SubmissionState::Uploading);
    assert!(controller.form().error_file().text().is_none());

    controller.wait_for_upload().await;

    assert_eq!(controller.state(), SubmissionState::UploadOk);
    assert_eq!(
        controller.draft().file_url(),
        Some("https://localhost:3456/images/image.jpg")
    );
    assert_eq!(controller.draft().file_name(), Some("image.jpg"));
    assert_eq!(controller.draft().file_key(), Some("key-image.jpg"));
    assert_eq!(
        store.creates.lock().unwrap().clone(),
        vec![("image.jpg".to_string(), "a@a".to_string())]
    );
}

#[tokio::test]
async fn test_cancelled_file_dialog_is_a_no_op() {
    let (mut controller, store, _) = controller_with(MockStore::default());

    assert_eq!(controller.handle_change_file(Vec::new()), FileChange::Cancelled);
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert_eq!(controller.transitions(), &[SubmissionState::Idle]);
    assert!(!controller.form().error_file().is_visible());
    assert_eq!(store.create_count(), 0);
}

#[tokio::test]
async fn test_full_form_is_persisted_and_navigates() {
    let (mut controller, store, navigator) = controller_with(MockStore::default());
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);
    controller.wait_for_upload().await;

    let outcome = controller.handle_submit().await;

    let expected = expected_transports_bill(
        Some("https://localhost:3456/images/image.png"),
        Some("image.png"),
    );
    match outcome {
        SubmitOutcome::Navigated(saved) => {
            assert_eq!(saved, expected);
            assert_eq!(saved.status, BillStatus::Pending);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // update は一回、遷移も一回
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0.as_deref(), Some("key-image.png"));
    assert_eq!(navigator.routes(), vec![Route::Bills]);

    assert_eq!(controller.state(), SubmissionState::Navigated);
    assert!(controller.draft().is_sealed());
    assert_eq!(
        controller.transitions(),
        &[
            SubmissionState::Idle,
            SubmissionState::FileChosen,
            SubmissionState::Uploading,
            SubmissionState::UploadOk,
            SubmissionState::Submitting,
            SubmissionState::Navigated,
        ]
    );
}

#[tokio::test]
async fn test_incomplete_form_is_not_submitted() {
    let (mut controller, store, navigator) = controller_with(MockStore::default());
    controller
        .form_mut()
        .set(FormField::ExpenseType, "Transports")
        .set(FormField::Amount, "50");

    let outcome = controller.handle_submit().await;

    match outcome {
        SubmitOutcome::Blocked(issues) => {
            let fields: Vec<FormField> = issues.iter().map(|issue| issue.field).collect();
            assert_eq!(fields, vec![FormField::Date, FormField::Pct, FormField::File]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(store.updates().is_empty());
    assert!(navigator.routes().is_empty());
    assert_eq!(controller.state(), SubmissionState::Idle);
}

#[tokio::test]
async fn test_persist_error_keeps_form_and_allows_retry() {
    let (mut controller, store, navigator) =
        controller_with(MockStore::failing_persist(AppError::persist(None, "Erreur 404")));
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);
    controller.wait_for_upload().await;

    let outcome = controller.handle_submit().await;

    assert!(matches!(outcome, SubmitOutcome::Failed(AppError::Persist { .. })));
    let form = controller.form();
    assert_eq!(form.error_file().text(), Some("Erreur 404"));
    assert!(!form.submit_button().disabled);
    assert_eq!(form.value(FormField::Amount), "50");
    assert_eq!(form.value(FormField::ExpenseType), "Transports");
    assert_eq!(form.file_input().value(), "image.png");
    assert!(navigator.routes().is_empty());
    assert_eq!(controller.state(), SubmissionState::UploadOk);
    assert!(controller
        .transitions()
        .contains(&SubmissionState::SubmitFailed));
    assert!(!controller.draft().is_sealed());

    // 一覧画面のエラー表示も同じ文言になる
    let html = render_error_page(controller.form().error_file().message());
    assert!(html.contains("Erreur 404"));

    // 再送信で保存できる
    let retry = controller.handle_submit().await;
    assert!(matches!(retry, SubmitOutcome::Navigated(_)));
    assert_eq!(store.updates().len(), 2);
    assert_eq!(navigator.routes(), vec![Route::Bills]);
    assert!(controller.form().error_file().text().is_none());
}

#[tokio::test]
async fn test_persist_error_with_status_shows_erreur_500() {
    let (mut controller, _, _) =
        controller_with(MockStore::failing_persist(AppError::persist(Some(500), "boom")));
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);
    controller.wait_for_upload().await;

    controller.handle_submit().await;

    assert_eq!(controller.form().error_file().text(), Some("Erreur 500"));
}

#[tokio::test]
async fn test_submit_before_upload_completes_goes_through_upload_pending() {
    let gate = Arc::new(Notify::new());
    let (mut controller, store, navigator) = controller_with(MockStore {
        upload_gate: Some(("image.png", gate.clone())),
        ..MockStore::default()
    });
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);

    let outcome = controller.handle_submit().await;

    // 送信はブロックされず、領収書なしで保存される
    match outcome {
        SubmitOutcome::Navigated(saved) => {
            assert_eq!(saved, expected_transports_bill(None, None));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(controller
        .transitions()
        .contains(&SubmissionState::UploadPending));
    assert_eq!(store.updates()[0].0, None);
    assert_eq!(navigator.routes(), vec![Route::Bills]);

    // 遅れて届いたアップロード結果は保存済みドラフトを変更しない
    gate.notify_one();
    controller.wait_for_upload().await;

    assert_eq!(controller.state(), SubmissionState::Navigated);
    assert_eq!(controller.draft().file_url(), None);
    assert_eq!(store.create_count(), 1);
}

#[tokio::test]
async fn test_upload_failure_does_not_block_submission() {
    let (mut controller, store, navigator) = controller_with(MockStore {
        upload_failure: Some(500),
        ..MockStore::default()
    });
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.jpg", "image/jpeg")]);
    controller.wait_for_upload().await;

    assert_eq!(controller.state(), SubmissionState::UploadFailed);
    assert_eq!(controller.form().error_file().text(), Some("Erreur 500"));
    assert!(!controller.draft().has_file());

    let outcome = controller.handle_submit().await;

    match outcome {
        SubmitOutcome::Navigated(saved) => {
            assert_eq!(saved.file_url, None);
            assert_eq!(saved.file_name, None);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.updates().len(), 1);
    assert_eq!(navigator.routes(), vec![Route::Bills]);
}

#[tokio::test]
async fn test_events_after_navigation_are_ignored() {
    let (mut controller, store, navigator) = controller_with(MockStore::default());
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);
    controller.wait_for_upload().await;
    controller.handle_submit().await;

    assert_eq!(
        controller.handle_change_file(vec![image("other.png", "image/png")]),
        FileChange::Ignored
    );
    assert!(matches!(
        controller.handle_submit().await,
        SubmitOutcome::Ignored
    ));
    assert_eq!(store.create_count(), 1);
    assert_eq!(store.updates().len(), 1);
    assert_eq!(navigator.routes(), vec![Route::Bills]);
}

#[tokio::test]
async fn test_rejected_file_after_accepted_one_blocks_submit() {
    let (mut controller, store, _) = controller_with(MockStore::default());
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);
    controller.wait_for_upload().await;

    controller.handle_change_file(vec![image("notes.pdf", "application/pdf")]);

    assert!(!controller.draft().has_file());
    match controller.handle_submit().await {
        SubmitOutcome::Blocked(issues) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].field, FormField::File);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(store.updates().is_empty());
}

#[test]
fn test_change_file_without_runtime_reports_upload_failure() {
    let (mut controller, store, _) = controller_with(MockStore::default());

    // ランタイム外でもパニックせず、アップロード失敗として扱う
    let change = controller.handle_change_file(vec![image("image.jpg", "image/jpeg")]);
    assert!(matches!(change, FileChange::UploadStarted { .. }));

    controller.drain_commands();
    assert_eq!(controller.state(), SubmissionState::UploadFailed);
    assert!(controller.form().error_file().is_visible());
    assert_eq!(store.create_count(), 0);
}

#[tokio::test]
async fn test_slow_upload_of_previous_file_does_not_replace_current_receipt() {
    let gate = Arc::new(Notify::new());
    let (mut controller, store, navigator) = controller_with(MockStore {
        upload_gate: Some(("a.png", gate.clone())),
        ..MockStore::default()
    });
    fill_transports_form(&mut controller);

    controller.handle_change_file(vec![image("a.png", "image/png")]);
    controller.handle_change_file(vec![image("b.png", "image/png")]);
    settle_finished_uploads(&mut controller).await;

    assert_eq!(controller.state(), SubmissionState::UploadOk);
    assert_eq!(controller.draft().file_name(), Some("b.png"));
    assert!(controller.is_upload_in_flight());

    // 先に選んだファイルのアップロードが後から完了する
    gate.notify_one();
    controller.wait_for_upload().await;

    assert_eq!(controller.form().file_input().value(), "b.png");
    assert_eq!(controller.draft().file_name(), Some("b.png"));
    assert_eq!(controller.draft().file_key(), Some("key-b.png"));
    assert_eq!(controller.state(), SubmissionState::UploadOk);

    match controller.handle_submit().await {
        SubmitOutcome::Navigated(saved) => {
            assert_eq!(saved.file_name.as_deref(), Some("b.png"));
            assert_eq!(
                saved.file_url.as_deref(),
                Some("https://localhost:3456/images/b.png")
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.updates()[0].0.as_deref(), Some("key-b.png"));
    assert_eq!(navigator.routes(), vec![Route::Bills]);
}

#[tokio::test]
async fn test_pending_upload_does_not_reattach_after_rejected_file() {
    let gate = Arc::new(Notify::new());
    let (mut controller, store, _) = controller_with(MockStore {
        upload_gate: Some(("a.png", gate.clone())),
        ..MockStore::default()
    });
    fill_transports_form(&mut controller);

    controller.handle_change_file(vec![image("a.png", "image/png")]);
    assert_eq!(
        controller.handle_change_file(vec![image("x.pdf", "application/pdf")]),
        FileChange::Rejected
    );

    gate.notify_one();
    controller.wait_for_upload().await;

    assert_eq!(controller.form().file_input().value(), "");
    assert!(!controller.draft().has_file());
    assert_eq!(controller.state(), SubmissionState::Idle);
    assert_eq!(
        controller.form().error_file().text(),
        Some(REJECTED_FILE_MESSAGE)
    );

    // ファイル未選択のため送信されない
    assert!(matches!(
        controller.handle_submit().await,
        SubmitOutcome::Blocked(_)
    ));
    assert!(store.updates().is_empty());
}

#[tokio::test]
async fn test_submit_waits_only_for_current_file() {
    let gate = Arc::new(Notify::new());
    let (mut controller, store, _) = controller_with(MockStore {
        upload_gate: Some(("a.png", gate.clone())),
        ..MockStore::default()
    });
    fill_transports_form(&mut controller);

    controller.handle_change_file(vec![image("a.png", "image/png")]);
    controller.handle_change_file(vec![image("b.png", "image/png")]);
    settle_finished_uploads(&mut controller).await;

    // 古いアップロードが残っていても現在のファイルは完了済み
    assert!(matches!(
        controller.handle_submit().await,
        SubmitOutcome::Navigated(_)
    ));
    assert!(!controller
        .transitions()
        .contains(&SubmissionState::UploadPending));
    assert_eq!(store.updates()[0].0.as_deref(), Some("key-b.png"));

    gate.notify_one();
    controller.wait_for_upload().await;
    assert_eq!(controller.draft().file_name(), Some("b.png"));
}

#[tokio::test]
async fn test_crashed_upload_task_is_reported_as_failure() {
    let (mut controller, _, _) = controller_with(MockStore {
        panic_on_upload: true,
        ..MockStore::default()
    });
    fill_transports_form(&mut controller);
    controller.handle_change_file(vec![image("image.png", "image/png")]);

    // タスクが結果を送らずに終了しても待ち続けない
    controller.wait_for_upload().await;

    assert!(!controller.is_upload_in_flight());
    assert_eq!(controller.state(), SubmissionState::UploadFailed);
    assert!(controller.form().error_file().is_visible());
    assert!(!controller.draft().has_file());

    assert!(matches!(
        controller.handle_submit().await,
        SubmitOutcome::Navigated(_)
    ));
}
