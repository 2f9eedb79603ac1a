// 領収書ファイルの検証

use log::debug;

/// 受け付ける画像拡張子
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// ファイル形式が拒否されたときにエラー領域へ表示する文言
pub const REJECTED_FILE_MESSAGE: &str = "Seuls les fichiers jpg, jpeg ou png sont acceptés";

/// 検証結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// 受理（ファイル名はそのまま返す）
    Accepted(String),
    /// 拒否
    Rejected,
}

impl FileCheck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FileCheck::Accepted(_))
    }
}

/// ファイル名の最後の `.` 以降を小文字で取り出す
///
/// `.` を含まない場合は None。
pub fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
}

/// ファイル名を検証する
pub fn validate(file_name: &str) -> FileCheck {
    let accepted = extension_of(file_name)
        .map(|extension| ACCEPTED_EXTENSIONS.contains(&extension.as_str()))
        .unwrap_or(false);

    debug!("ファイル形式を検証しました: file_name={file_name}, accepted={accepted}");

    if accepted {
        FileCheck::Accepted(file_name.to_string())
    } else {
        FileCheck::Rejected
    }
}

/// ファイル名からContent-Typeを推定
pub fn content_type(file_name: &str) -> &'static str {
    match extension_of(file_name).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
