// 一覧画面のエラー表示
//
// 一覧取得が失敗したときに代わりに表示するページ。メッセージ
// （`Erreur 404` など）はそのままテキストとして埋め込む。

/// エラーページのHTMLを生成する
pub fn render_error_page(message: &str) -> String {
    format!(
        r#"<div class="layout">
  <div class="content">
    <div class="content-header">
      <div class="content-title"> Erreur </div>
    </div>
    <div data-testid="error-message">
      {}
    </div>
  </div>
</div>"#,
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
