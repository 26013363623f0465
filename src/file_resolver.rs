// src/file_resolver.rs
use path_absolutize::Absolutize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};

/// `load_children_str` に含まれる `import("...")` の文字列部分を取り出し、
/// 親ファイル (`parent_file`) のディレクトリを基準にして、
/// 実際の routing ファイル (.ts) を探しに行く関数。
///
/// - `load_children_str`: loadChildren の式のソーステキスト
///   (例: "() => import('./feature/feature.module').then(m => m.FeatureModule)")
/// - `parent_file`: その式を持つ親ファイルのパス
///
/// 戻り値:
/// - Ok(Some(path)) → 見つかった routing ファイルの絶対パス
/// - Ok(None)       → 見つからなかった (子ルートなしとみなす)
pub fn resolve_load_children_path(
    load_children_str: &str,
    parent_file: &Path,
) -> Result<Option<PathBuf>> {
    // 1) `import("...")` / `import('...')` のクォート内パスを抽出 (簡易実装)
    let import_path = match extract_import_path(load_children_str) {
        Some(p) => p,
        None => return Ok(None),
    };

    // 2) parent_file の親ディレクトリを基準にして相対パスを結合
    //    例: parent_file = /proj/src/app/app-routing.module.ts
    //        import_path = "./feature/feature.module"
    //    → candidate_base = /proj/src/app/feature/feature.module
    let parent_dir = parent_dir_of(parent_file)?;
    let candidate_base = parent_dir.join(import_path);

    // 3) 典型的なファイル名パターンをいくつか列挙
    let mut candidates: Vec<PathBuf> = Vec::new();

    // A) feature.module.ts を直接探す
    candidates.push(candidate_base.with_extension("ts"));

    // B) feature-routing.module.ts が隣にあるか探す
    if let Some(stem) = candidate_base.file_stem() {
        let routing_name = format!("{}-routing.module.ts", stem.to_string_lossy());
        candidates.push(candidate_base.with_file_name(routing_name));
    }

    // C) candidate_base がディレクトリだったら、その中の <stem>-routing.module.ts を探す
    if candidate_base.is_dir() {
        if let Some(stem) = candidate_base.file_name() {
            candidates
                .push(candidate_base.join(format!("{}-routing.module.ts", stem.to_string_lossy())));
        }
    }

    // 4) 列挙した候補を絶対パス化し、最初に存在するものを返却
    for cand in candidates {
        let abs = absolutize(&cand)?;
        if fs::metadata(&abs).is_ok() {
            return Ok(Some(abs));
        }
    }

    // 5) どれにも該当しなければ None
    Ok(None)
}

/// templateUrl を宣言ファイルのディレクトリ基準で絶対パス化する。
/// 存在チェックは行わない (読み込み失敗は呼び出し側で致命扱い)
pub fn resolve_template_path(template_url: &str, declaring_file: &Path) -> Result<PathBuf> {
    let parent_dir = parent_dir_of(declaring_file)?;
    absolutize(&parent_dir.join(template_url))
}

fn extract_import_path(expr: &str) -> Option<String> {
    for open in ["import(\"", "import('"] {
        if let Some(start) = expr.find(open) {
            let quote = open.chars().last().unwrap();
            let sub = &expr[start + open.len()..];
            if let Some(end) = sub.find(quote) {
                return Some(sub[..end].to_string());
            }
        }
    }
    None
}

fn parent_dir_of(file: &Path) -> Result<&Path> {
    file.parent().ok_or_else(|| AnalyzerError::Io {
        path: file.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "親ファイルのディレクトリが取得できません",
        ),
    })
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .to_path_buf())
}
