// src/ts.rs
//
// SWC による TypeScript パースの共通処理。
// ルーティング解析・コンポーネント解析の両方がここを通る。

use std::fs;
use std::path::Path;

use swc_common::{FileName, SourceMap, SourceMapper, Span, sync::Lrc};
use swc_ecma_ast::{Module, PropName};
use swc_ecma_parser::{Parser as SwcParser, StringInput, Syntax, TsConfig, lexer::Lexer};

use crate::error::{AnalyzerError, Result};

/// パース結果。スパンからソーステキストを復元するために
/// SourceMap も一緒に持ち回る
pub struct ParsedSource {
    pub module: Module,
    pub source_map: Lrc<SourceMap>,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl ParsedSource {
    /// スパンに対応するソーステキストを切り出す。
    /// 復元できない場合は空文字列
    pub fn snippet(&self, span: Span) -> String {
        self.source_map.span_to_snippet(span).unwrap_or_default()
    }
}

/// プロパティキー名を取り出す (ident / 文字列キーの両対応。
/// 文字列キーはクォートが外れた状態になる)
pub fn prop_name(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        _ => None,
    }
}

/// TypeScript ファイルを読み込んでパースする
pub fn parse_ts_file(file_path: &Path) -> Result<ParsedSource> {
    let src = fs::read_to_string(file_path).map_err(|source| AnalyzerError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    parse_ts_source(FileName::Real(file_path.to_path_buf()), src)
}

/// ソース文字列をパースする (テストでも使う)
pub fn parse_ts_source(name: FileName, src: String) -> Result<ParsedSource> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(name.clone(), src);

    // デコレータつき TypeScript をパースする設定
    let syntax = Syntax::Typescript(TsConfig {
        tsx: false,
        decorators: true,
        dts: false,
        no_early_errors: true,
        disallow_ambiguous_jsx_like: true,
    });

    let lexer = Lexer::new(syntax, Default::default(), StringInput::from(&*fm), None);
    let mut parser = SwcParser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| AnalyzerError::Parse {
        file: match &name {
            FileName::Real(p) => p.clone(),
            other => std::path::PathBuf::from(other.to_string()),
        },
        message: format!("{e:?}"),
    })?;

    Ok(ParsedSource {
        module,
        source_map: cm,
    })
}
