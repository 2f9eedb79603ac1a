// 画面遷移の窓口

use super::models::Route;
use log::{debug, warn};
use tokio::sync::mpsc;

/// 表示中の画面を切り替える外部コラボレーター
///
/// 一覧画面のフィルタ保存値のクリアなど、遷移に伴う副作用は実装側の責務。
pub trait NavigationGate: Send + Sync {
    fn on_navigate(&self, route: Route);
}

/// 遷移先をチャネルで画面ドライバーへ送るナビゲーター
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    sender: mpsc::UnboundedSender<Route>,
}

impl ChannelNavigator {
    /// ナビゲーターと遷移先の受信側を作成
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NavigationGate for ChannelNavigator {
    fn on_navigate(&self, route: Route) {
        debug!("画面遷移: {}", route.path());
        if self.sender.send(route).is_err() {
            warn!("画面ドライバーが終了しているため遷移を送信できません: {}", route.path());
        }
    }
}
