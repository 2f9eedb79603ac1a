// 作成中のノート（ドラフト）
//
// ドラフトが保持するのは提出者のメールと領収書の参照だけ。
// それ以外の項目は送信時にフォームから直接読み出す。

use super::form::BillFields;
use super::models::{Bill, BillStatus};
use crate::shared::errors::AppError;
use log::{debug, info, warn};

/// アップロード済み領収書への参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub file_url: String,
    pub file_key: String,
    pub file_name: String,
}

/// アップロードタスクからドラフトへ送られるコマンド
///
/// `generation` はアップロードを開始したファイル選択の世代。
/// その後にファイル選択が変わっていれば結果は破棄される。
#[derive(Debug)]
pub enum DraftCommand {
    /// アップロード成功: 領収書の参照を設定する
    AttachFile {
        generation: u64,
        file_url: String,
        file_key: String,
        file_name: String,
    },
    /// アップロード失敗: 参照は設定しない
    UploadFailed {
        generation: u64,
        file_name: String,
        error: AppError,
    },
}

impl DraftCommand {
    pub fn generation(&self) -> u64 {
        match self {
            DraftCommand::AttachFile { generation, .. }
            | DraftCommand::UploadFailed { generation, .. } => *generation,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            DraftCommand::AttachFile { file_name, .. }
            | DraftCommand::UploadFailed { file_name, .. } => file_name,
        }
    }
}

/// 作成中のノート
#[derive(Debug, Clone, PartialEq)]
pub struct BillDraft {
    email: String,
    file: Option<FileReference>,
    sealed: bool,
}

impl BillDraft {
    pub fn new<S: Into<String>>(email: S) -> Self {
        Self {
            email: email.into(),
            file: None,
            sealed: false,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn file(&self) -> Option<&FileReference> {
        self.file.as_ref()
    }

    pub fn file_url(&self) -> Option<&str> {
        self.file.as_ref().map(|file| file.file_url.as_str())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|file| file.file_name.as_str())
    }

    /// ストア上のID（アップロード時に採番されたキー）
    pub fn file_key(&self) -> Option<&str> {
        self.file.as_ref().map(|file| file.file_key.as_str())
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// 保存済み（以降は変更しない）かどうか
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// アップロード結果を設定する
    ///
    /// 保存済みのドラフトは変更せず false を返す。
    pub fn attach_file(&mut self, file_url: String, file_key: String, file_name: String) -> bool {
        if self.sealed {
            warn!("保存済みのドラフトへの領収書設定を無視しました: file_name={file_name}");
            return false;
        }

        info!("ドラフトに領収書を設定しました: file_name={file_name}, key={file_key}");
        self.file = Some(FileReference {
            file_url,
            file_key,
            file_name,
        });
        true
    }

    /// 領収書の参照を外す
    pub fn clear_file(&mut self) {
        if self.sealed {
            warn!("保存済みのドラフトはクリアできません");
            return;
        }
        if self.file.take().is_some() {
            debug!("ドラフトの領収書参照をクリアしました");
        }
    }

    /// フォームの値と組み合わせて保存用のノートを組み立てる
    ///
    /// ステータスは常に `pending`。
    pub fn assemble(&self, fields: &BillFields) -> Bill {
        Bill {
            id: None,
            email: self.email.clone(),
            expense_type: fields.expense_type,
            name: fields.name.clone(),
            date: fields.date,
            amount: fields.amount,
            vat: fields.vat,
            pct: fields.pct,
            commentary: fields.commentary.clone(),
            file_url: self.file_url().map(str::to_string),
            file_name: self.file_name().map(str::to_string),
            status: BillStatus::Pending,
        }
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }
}
