// ノート・ド・フレ（経費ノート）作成機能モジュール

pub mod controller;
pub mod draft;
pub mod error_page;
pub mod form;
pub mod models;
pub mod navigation;
pub mod store;
pub mod validator;

#[cfg(test)]
mod controller_test;

// 公開インターフェース

// モデル
pub use models::{Bill, BillStatus, ExpenseType, Route, SessionUser, UploadedReceipt};

// フォーム
pub use form::{
    BillFields, ErrorRegion, FieldIssue, FileInput, FormField, NewBillForm, SelectedFile,
    SubmitButton,
};

// ドラフト
pub use draft::{BillDraft, DraftCommand, FileReference};

// 検証
pub use validator::{FileCheck, ACCEPTED_EXTENSIONS, REJECTED_FILE_MESSAGE};

// ストア
pub use store::{BillStore, HttpBillStore};

// 画面遷移
pub use navigation::{ChannelNavigator, NavigationGate};

// コントローラー
pub use controller::{FileChange, SubmissionController, SubmissionState, SubmitOutcome};

pub use error_page::render_error_page;
