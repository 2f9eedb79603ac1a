// 「Envoyer une note de frais」フォームの状態モデル
//
// 画面（Webビュー、テスト）から入力値を受け取り、送信時に一度だけ読み出す。

use super::models::ExpenseType;
use super::validator;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{
    file_name_from_input_value, non_empty, parse_date, parse_non_negative_integer,
    parse_optional_number, validate_required_field,
};
use chrono::NaiveDate;
use log::debug;
use std::path::Path;

/// フォームの見出し
pub const FORM_TITLE: &str = "Envoyer une note de frais";

/// 送信ボタンのラベル
pub const SUBMIT_LABEL: &str = "Envoyer";

/// ユーザーが選択したファイル
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    /// 宣言されたメディアタイプ（空の場合は拡張子から推定する）
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new<N: Into<String>, M: Into<String>>(name: N, media_type: M, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// ファイル入力の値（`C:\fakepath\...`）から作成する
    pub fn from_input_value<M: Into<String>>(value: &str, media_type: M, bytes: Vec<u8>) -> Self {
        Self::new(file_name_from_input_value(value), media_type, bytes)
    }

    /// ディスク上のファイルを読み込んで作成する
    pub async fn from_path<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                AppError::validation(format!("ファイル名の取得に失敗しました: {}", path.display()))
            })?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        debug!("ファイルを読み込みました: name={name}, size={} bytes", bytes.len());

        let media_type = validator::content_type(&name).to_string();
        Ok(Self::new(name, media_type, bytes))
    }

    /// アップロード時に使うContent-Type
    pub fn content_type(&self) -> &str {
        if self.media_type.trim().is_empty() {
            validator::content_type(&self.name)
        } else {
            &self.media_type
        }
    }
}

/// `<input type="file">` 相当
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileInput {
    files: Vec<SelectedFile>,
    value: String,
}

impl FileInput {
    /// 表示されている値（未選択なら空文字）
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub(crate) fn select(&mut self, files: Vec<SelectedFile>) {
        self.value = files.first().map(|file| file.name.clone()).unwrap_or_default();
        self.files = files;
    }

    pub(crate) fn clear(&mut self) {
        self.files.clear();
        self.value.clear();
    }
}

/// `errorFile` 領域
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRegion {
    visible: bool,
    message: String,
}

impl ErrorRegion {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 表示中のテキスト
    pub fn text(&self) -> Option<&str> {
        self.visible.then_some(self.message.as_str())
    }

    pub(crate) fn show<S: Into<String>>(&mut self, message: S) {
        self.message = message.into();
        self.visible = true;
    }

    pub(crate) fn hide(&mut self) {
        self.visible = false;
        self.message.clear();
    }
}

/// 送信ボタン
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitButton {
    pub label: &'static str,
    pub disabled: bool,
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self {
            label: SUBMIT_LABEL,
            disabled: false,
        }
    }
}

/// フォームの入力項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    ExpenseType,
    ExpenseName,
    Date,
    Amount,
    Vat,
    Pct,
    Commentary,
    File,
}

impl FormField {
    /// 画面上の `data-testid`
    pub fn test_id(&self) -> &'static str {
        match self {
            FormField::ExpenseType => "expense-type",
            FormField::ExpenseName => "expense-name",
            FormField::Date => "datepicker",
            FormField::Amount => "amount",
            FormField::Vat => "vat",
            FormField::Pct => "pct",
            FormField::Commentary => "commentary",
            FormField::File => "file",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            FormField::ExpenseType
                | FormField::Date
                | FormField::Amount
                | FormField::Pct
                | FormField::File
        )
    }
}

/// 送信を妨げた入力項目
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: FormField,
    pub message: String,
}

impl FieldIssue {
    fn from_error(field: FormField, error: AppError) -> Self {
        Self {
            field,
            message: error.user_message(),
        }
    }
}

/// 送信時に読み出したフォームの値
#[derive(Debug, Clone, PartialEq)]
pub struct BillFields {
    pub expense_type: ExpenseType,
    pub name: String,
    pub date: NaiveDate,
    pub amount: u32,
    pub vat: Option<f64>,
    pub pct: u32,
    pub commentary: Option<String>,
}

/// 新規ノート作成フォーム
#[derive(Debug, Clone, Default)]
pub struct NewBillForm {
    expense_type: String,
    name: String,
    date: String,
    amount: String,
    vat: String,
    pct: String,
    commentary: String,
    file_input: FileInput,
    error_file: ErrorRegion,
    submit_button: SubmitButton,
}

impl NewBillForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &'static str {
        FORM_TITLE
    }

    /// テキスト系の入力値を設定する（ファイル入力は変更イベント経由のみ）
    pub fn set(&mut self, field: FormField, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match field {
            FormField::ExpenseType => self.expense_type = value,
            FormField::ExpenseName => self.name = value,
            FormField::Date => self.date = value,
            FormField::Amount => self.amount = value,
            FormField::Vat => self.vat = value,
            FormField::Pct => self.pct = value,
            FormField::Commentary => self.commentary = value,
            FormField::File => {
                log::warn!("ファイル入力は変更イベントでのみ設定できます");
            }
        }
        self
    }

    /// 入力値を取得する（ファイル入力は表示値）
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::ExpenseType => &self.expense_type,
            FormField::ExpenseName => &self.name,
            FormField::Date => &self.date,
            FormField::Amount => &self.amount,
            FormField::Vat => &self.vat,
            FormField::Pct => &self.pct,
            FormField::Commentary => &self.commentary,
            FormField::File => self.file_input.value(),
        }
    }

    pub fn file_input(&self) -> &FileInput {
        &self.file_input
    }

    pub(crate) fn file_input_mut(&mut self) -> &mut FileInput {
        &mut self.file_input
    }

    pub fn error_file(&self) -> &ErrorRegion {
        &self.error_file
    }

    pub(crate) fn error_file_mut(&mut self) -> &mut ErrorRegion {
        &mut self.error_file
    }

    pub fn submit_button(&self) -> &SubmitButton {
        &self.submit_button
    }

    /// 未入力の必須項目
    pub fn missing_required(&self) -> Vec<FormField> {
        let fields = [
            FormField::ExpenseType,
            FormField::Date,
            FormField::Amount,
            FormField::Pct,
        ];

        let mut missing: Vec<FormField> = fields
            .into_iter()
            .filter(|field| validate_required_field(self.value(*field), field.test_id()).is_err())
            .collect();

        if self.file_input.is_empty() {
            missing.push(FormField::File);
        }
        missing
    }

    /// 送信時に全入力値を読み出す
    ///
    /// 必須項目の未入力や数値・日付の不正があれば、ネイティブの
    /// フォーム検証と同様に送信を止めて問題の項目を返す。
    pub fn read_fields(&self) -> Result<BillFields, Vec<FieldIssue>> {
        let mut issues: Vec<FieldIssue> = self
            .missing_required()
            .into_iter()
            .filter_map(|field| {
                validate_required_field(self.value(field), field.test_id())
                    .err()
                    .map(|error| FieldIssue::from_error(field, error))
            })
            .collect();

        let expense_type = if self.expense_type.trim().is_empty() {
            None
        } else {
            let parsed = ExpenseType::from_label(&self.expense_type);
            if parsed.is_none() {
                issues.push(FieldIssue {
                    field: FormField::ExpenseType,
                    message: format!("Type de dépense inconnu: {}", self.expense_type),
                });
            }
            parsed
        };

        let date = self.parse_present(FormField::Date, &mut issues, parse_date);
        let amount = self.parse_present(FormField::Amount, &mut issues, |value| {
            parse_non_negative_integer(value, "Montant")
        });
        let pct = self.parse_present(FormField::Pct, &mut issues, |value| {
            parse_non_negative_integer(value, "Pourcentage")
        });
        let vat = match parse_optional_number(&self.vat, "TVA") {
            Ok(vat) => vat,
            Err(error) => {
                issues.push(FieldIssue::from_error(FormField::Vat, error));
                None
            }
        };

        match (expense_type, date, amount, pct) {
            (Some(expense_type), Some(date), Some(amount), Some(pct)) if issues.is_empty() => {
                Ok(BillFields {
                    expense_type,
                    name: self.name.trim().to_string(),
                    date,
                    amount,
                    vat,
                    pct,
                    commentary: non_empty(&self.commentary),
                })
            }
            _ => Err(issues),
        }
    }

    fn parse_present<T>(
        &self,
        field: FormField,
        issues: &mut Vec<FieldIssue>,
        parse: impl Fn(&str) -> AppResult<T>,
    ) -> Option<T> {
        let value = self.value(field);
        if value.trim().is_empty() {
            // 未入力は必須チェックで報告済み
            return None;
        }
        match parse(value) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                issues.push(FieldIssue::from_error(field, error));
                None
            }
        }
    }
}
