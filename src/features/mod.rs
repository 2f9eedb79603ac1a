// 機能モジュール

pub mod bills;
