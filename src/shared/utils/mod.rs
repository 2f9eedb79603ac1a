use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;

/// 日付文字列を解析する
///
/// # バリデーション規則
/// - YYYY-MM-DD形式であること
/// - 実在する日付であること
pub fn parse_date(date_str: &str) -> AppResult<NaiveDate> {
    let date_str = date_str.trim();

    if date_str.len() != 10
        || date_str.chars().nth(4) != Some('-')
        || date_str.chars().nth(7) != Some('-')
    {
        return Err(AppError::validation(
            "La date doit être au format AAAA-MM-JJ",
        ));
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| AppError::validation("Date invalide"))
}

/// 0以上の整数を解析する（`type=number min=0` の入力と同じ扱い）
pub fn parse_non_negative_integer(value: &str, field_name: &str) -> AppResult<u32> {
    value.trim().parse::<u32>().map_err(|_| {
        AppError::validation(format!("{field_name} doit être un entier positif ou nul"))
    })
}

/// 任意入力の数値を解析する（空欄は None）
pub fn parse_optional_number(value: &str, field_name: &str) -> AppResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Ok(Some(number)),
        _ => Err(AppError::validation(format!(
            "{field_name} doit être un nombre positif ou nul"
        ))),
    }
}

/// 必須フィールドのバリデーション
pub fn validate_required_field(text: &str, field_name: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation(format!(
            "Le champ {field_name} est obligatoire"
        )));
    }
    Ok(())
}

/// 空白のみの入力を None にする
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// ファイル入力の値（`C:\fakepath\image.jpg` など）からファイル名を取り出す
pub fn file_name_from_input_value(value: &str) -> &str {
    value.rsplit(['\\', '/']).next().unwrap_or(value)
}
