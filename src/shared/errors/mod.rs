use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// バリデーション関連のエラー（ファイル形式、フォーム入力）
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 領収書アップロードのエラー
    #[error("アップロードエラー: {message} (status={status:?})")]
    Upload {
        status: Option<u16>,
        message: String,
    },

    /// ノートの保存エラー
    #[error("保存エラー: {message} (status={status:?})")]
    Persist {
        status: Option<u16>,
        message: String,
    },

    /// 一覧取得などの隣接サービスのエラー
    #[error("サービスエラー: {message} (status={status:?})")]
    Service {
        status: Option<u16>,
        message: String,
    },

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（設定エラーなど）
    High,
}

/// HTTPステータスを画面表示用の文言に変換する
pub fn status_message(status: u16) -> String {
    format!("Erreur {status}")
}

impl AppError {
    /// エラー領域に表示するメッセージを取得
    ///
    /// HTTPステータスがある場合は `Erreur <status>` を、
    /// それ以外はサーバーまたは検証の文言をそのまま返す。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Upload { status, message }
            | AppError::Persist { status, message }
            | AppError::Service { status, message } => match status {
                Some(code) => status_message(*code),
                None => message.clone(),
            },
            AppError::Configuration(_) => "Erreur de configuration".to_string(),
            AppError::Io(_) => "Erreur de lecture du fichier".to_string(),
            AppError::Json(_) => "Réponse du serveur invalide".to_string(),
        }
    }

    /// HTTPステータスを取得（存在する場合）
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Upload { status, .. }
            | AppError::Persist { status, .. }
            | AppError::Service { status, .. } => *status,
            _ => None,
        }
    }

    /// エラーの詳細情報を取得（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::Upload { .. } => ErrorSeverity::Medium,
            AppError::Persist { .. } => ErrorSeverity::Medium,
            AppError::Service { .. } => ErrorSeverity::Medium,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Medium,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// アップロードエラーを作成するヘルパー関数
    pub fn upload<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        AppError::Upload {
            status,
            message: message.into(),
        }
    }

    /// 保存エラーを作成するヘルパー関数
    pub fn persist<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        AppError::Persist {
            status,
            message: message.into(),
        }
    }

    /// サービスエラーを作成するヘルパー関数
    pub fn service<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        AppError::Service {
            status,
            message: message.into(),
        }
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }
}

/// AppErrorからStringへの変換（画面表示用）
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.user_message()
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;
