// ノートストアとの通信（領収書アップロードとノート保存）

use super::form::SelectedFile;
use super::models::{Bill, UploadedReceipt};
use crate::shared::api_client::{ApiClient, ApiClientConfig};
use crate::shared::errors::{AppError, AppResult};
use futures::future::BoxFuture;
use log::{debug, error, info};
use reqwest::multipart;

/// リモートストアの抽象
///
/// どちらの操作もリトライしない。失敗は一度だけ呼び出し元に返す。
pub trait BillStore: Send + Sync {
    /// 領収書をマルチパート（`file` + `email`）でアップロードする
    fn create(&self, file: SelectedFile, email: String) -> BoxFuture<'_, AppResult<UploadedReceipt>>;

    /// 完成したノートを保存する
    ///
    /// `id` はアップロード時に採番されたキー。アップロードが完了していない
    /// 場合は None になる。
    fn update<'a>(&'a self, id: Option<&'a str>, bill: &'a Bill) -> BoxFuture<'a, AppResult<Bill>>;
}

/// HTTP経由のノートストア
#[derive(Debug, Clone)]
pub struct HttpBillStore {
    api: ApiClient,
}

impl HttpBillStore {
    pub fn new(config: ApiClientConfig) -> AppResult<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    /// 環境変数の設定で作成する
    pub fn from_env() -> AppResult<Self> {
        Self::new(ApiClientConfig::from_env())
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn create_receipt(&self, file: SelectedFile, email: String) -> AppResult<UploadedReceipt> {
        info!(
            "領収書アップロード開始: file_name={}, size={} bytes",
            file.name,
            file.bytes.len()
        );

        let content_type = file.content_type().to_string();
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.name.clone())
            .mime_str(&content_type)
            .map_err(|e| AppError::upload(None, format!("MIMEタイプ設定エラー: {e}")))?;
        let form = multipart::Form::new().part("file", part).text("email", email);

        let response = self
            .api
            .post("bills")?
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("領収書アップロードの送信に失敗しました: {e}");
                AppError::upload(e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        if !response.status().is_success() {
            let failed = ApiClient::handle_error_response(response).await;
            return Err(AppError::upload(Some(failed.status), failed.message));
        }

        let receipt: UploadedReceipt = response
            .json()
            .await
            .map_err(|e| AppError::upload(None, format!("レスポンス解析エラー: {e}")))?;

        info!(
            "領収書アップロード成功: file_name={}, key={}, url={}",
            file.name, receipt.key, receipt.file_url
        );
        Ok(receipt)
    }

    async fn persist_bill(&self, id: Option<&str>, bill: &Bill) -> AppResult<Bill> {
        let request = match id {
            Some(id) => {
                info!("ノート保存開始: id={id}");
                self.api
                    .put(&format!("bills/{}", urlencoding::encode(id)))?
                    .json(bill)
            }
            None => {
                // アップロード未完了のノートは作成として送る
                info!("ノート保存開始: IDなし（領収書未確定）");
                self.api.post("bills")?.json(bill)
            }
        };

        let response = request.send().await.map_err(|e| {
            error!("ノート保存の送信に失敗しました: {e}");
            AppError::persist(e.status().map(|s| s.as_u16()), e.to_string())
        })?;

        if !response.status().is_success() {
            let failed = ApiClient::handle_error_response(response).await;
            return Err(AppError::persist(Some(failed.status), failed.message));
        }

        let saved: Bill = response
            .json()
            .await
            .map_err(|e| AppError::persist(None, format!("レスポンス解析エラー: {e}")))?;

        info!("ノート保存成功: id={:?}, status={:?}", saved.id, saved.status);
        Ok(saved)
    }

    /// 提出済みノートの一覧を取得する
    ///
    /// 失敗時は `Erreur <status>` を表示するサービスエラーを返す。
    pub async fn list(&self) -> AppResult<Vec<Bill>> {
        debug!("ノート一覧の取得開始");

        let response = self.api.get("bills")?.send().await.map_err(|e| {
            error!("ノート一覧の取得に失敗しました: {e}");
            AppError::service(e.status().map(|s| s.as_u16()), e.to_string())
        })?;

        if !response.status().is_success() {
            let failed = ApiClient::handle_error_response(response).await;
            return Err(AppError::service(Some(failed.status), failed.message));
        }

        let bills: Vec<Bill> = response
            .json()
            .await
            .map_err(|e| AppError::service(None, format!("レスポンス解析エラー: {e}")))?;

        debug!("ノート一覧を取得しました: {} 件", bills.len());
        Ok(bills)
    }
}

impl BillStore for HttpBillStore {
    fn create(&self, file: SelectedFile, email: String) -> BoxFuture<'_, AppResult<UploadedReceipt>> {
        Box::pin(self.create_receipt(file, email))
    }

    fn update<'a>(&'a self, id: Option<&'a str>, bill: &'a Bill) -> BoxFuture<'a, AppResult<Bill>> {
        Box::pin(self.persist_bill(id, bill))
    }
}
