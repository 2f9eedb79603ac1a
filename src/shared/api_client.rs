/// 汎用APIクライアント
///
/// ノート・ド・フレ（経費ノート）ストアとの通信で使用する共通部分。
/// ベースURLの解決、認証ヘッダーの付与、エラーレスポンスの解析を担当する。
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// デフォルトのAPIサーバーURL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5678";

/// APIクライアント設定
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    /// 転送層のタイムアウト（未設定の場合は無制限）
    pub timeout_seconds: Option<u64>,
    /// Bearerトークン（ログイン時に発行されたJWT）
    pub auth_token: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
            auth_token: None,
        }
    }
}

impl ApiClientConfig {
    /// 環境変数からAPIクライアント設定を読み込む
    ///
    /// * `BILLS_API_URL` - ベースURL（デフォルト: http://localhost:5678）
    /// * `BILLS_API_TIMEOUT_SECONDS` - タイムアウト秒数（任意）
    /// * `BILLS_API_TOKEN` - Bearerトークン（任意）
    pub fn from_env() -> Self {
        let base_url = crate::get_env_var_or_default!("BILLS_API_URL", DEFAULT_BASE_URL);

        let timeout_seconds = crate::get_env_var_optional!("BILLS_API_TIMEOUT_SECONDS").and_then(
            |value| match value.parse::<u64>() {
                Ok(seconds) => Some(seconds),
                Err(_) => {
                    warn!("BILLS_API_TIMEOUT_SECONDSのパースに失敗しました。タイムアウトなしで続行します: {value}");
                    None
                }
            },
        );

        let auth_token = crate::get_env_var_optional!("BILLS_API_TOKEN");

        info!(
            "API設定: base_url={base_url}, timeout={timeout_seconds:?}, token={}",
            if auth_token.is_some() { "あり" } else { "なし" }
        );

        Self {
            base_url,
            timeout_seconds,
            auth_token,
        }
    }

    /// ベースURLを指定して設定を作成
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// 設定を検証する
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.is_empty() {
            return Err(AppError::configuration(
                "APIサーバーのベースURLが設定されていません",
            ));
        }

        Url::parse(&self.base_url).map_err(|e| {
            AppError::configuration(format!("APIサーバーのベースURLが不正です: {e}"))
        })?;

        if self.timeout_seconds == Some(0) {
            return Err(AppError::configuration(
                "APIタイムアウトは0より大きい値である必要があります",
            ));
        }

        Ok(())
    }
}

/// APIサーバーからのエラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// 失敗したレスポンスから取り出した情報
#[derive(Debug, Clone, PartialEq)]
pub struct FailedResponse {
    pub status: u16,
    pub message: String,
}

/// 汎用APIクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// 設定を指定してAPIクライアントを作成
    pub fn new(config: ApiClientConfig) -> AppResult<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        // 末尾スラッシュを保証して join が最後のセグメントを置き換えないようにする
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| AppError::configuration(format!("APIサーバーのベースURLが不正です: {e}")))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token,
        })
    }

    /// ベースURL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// エンドポイントの完全なURLを組み立てる
    pub fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| AppError::configuration(format!("URLの組み立てに失敗しました: {e}")))
    }

    /// GETリクエストを準備
    pub fn get(&self, endpoint: &str) -> AppResult<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        debug!("GETリクエスト準備: url={url}");
        Ok(self.authorize(self.client.get(url)))
    }

    /// POSTリクエストを準備
    pub fn post(&self, endpoint: &str) -> AppResult<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        debug!("POSTリクエスト準備: url={url}");
        Ok(self.authorize(self.client.post(url)))
    }

    /// PUTリクエストを準備
    pub fn put(&self, endpoint: &str) -> AppResult<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        debug!("PUTリクエスト準備: url={url}");
        Ok(self.authorize(self.client.put(url)))
    }

    /// 認証トークンがある場合は追加
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// エラーレスポンスを処理
    ///
    /// JSON の `message` / `error` を優先し、なければ本文、本文も空なら
    /// ステータスの理由句を使う。
    pub async fn handle_error_response(response: Response) -> FailedResponse {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(ErrorResponse {
                message: Some(message),
                ..
            }) => message,
            Ok(ErrorResponse {
                error: Some(error), ..
            }) => error,
            _ if !body.trim().is_empty() => body,
            _ => reason_phrase(status),
        };

        warn!("APIサーバーエラー: status={}, message={message}", status.as_u16());

        FailedResponse {
            status: status.as_u16(),
            message,
        }
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
