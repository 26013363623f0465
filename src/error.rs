// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// 解析パイプライン全体のエラー型
///
/// 致命的エラーのみをここで表現する。ハンドラ未発見や
/// 未解決の動的ルートは非致命 (警告ログ + 空の解決結果) であり、
/// このエラー型には現れない。
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("ファイルを読み込めません: {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TypeScript のパースに失敗しました: {file:?}: {message}")]
    Parse { file: PathBuf, message: String },

    #[error("テンプレートの構文エラー (オフセット {offset}): {message}")]
    TemplateSyntax { message: String, offset: usize },

    #[error("コンポーネント {component} にテンプレートがありません (template / templateUrl いずれも未指定): {file:?}")]
    MissingTemplate { component: String, file: PathBuf },

    #[error("コンポーネント {component} の外部テンプレートを読み込めません: {path:?}")]
    TemplateUnreadable {
        component: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("コンポーネント {component} に selector がありません: {file:?}")]
    MissingSelector { component: String, file: PathBuf },

    #[error("メインのルーティングファイルが見つかりませんでした: {root:?}")]
    RoutingFileNotFound { root: PathBuf },
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
