// src/project_analyzer.rs
//
// プロジェクト全体のオーケストレータ。
// ソースツリーから @Component 宣言を持つクラスを発見し、
// テンプレート解決 → ウィジェット抽出 → ビジネスロジック解析を
// 順に実行して `{routeMap, componentMap}` を組み立てる。

use std::fs;
use std::path::{Path, PathBuf};

use swc_ecma_ast::*;
use swc_ecma_visit::Visit;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{AnalyzerError, Result};
use crate::file_resolver::resolve_template_path;
use crate::logic_analyzer::BusinessLogicAnalyzer;
use crate::model::{AnalysisResult, ComponentEntry, ComponentInfo, RouteMap};
use crate::route_analyzer::RouteAnalyzer;
use crate::template::parse_template;
use crate::ts::{ParsedSource, parse_ts_file, prop_name};
use crate::widget_analyzer::{TemplateAnalyzer, collect_nested_components};
use crate::widget_id::WidgetIdGenerator;

/// メインルーティングファイルとみなすファイル名の接尾辞
const ROUTING_FILE_SUFFIXES: &[&str] = &[
    "app-routing.module.ts",
    "app-routing.ts",
    "routing.module.ts",
    "routes.ts",
];

/// @Component デコレータから取り出した宣言情報
#[derive(Debug, Clone)]
struct ComponentDecl {
    class_name: String,
    selector: Option<String>,
    template: Option<String>,
    template_url: Option<String>,
    class: Class,
}

#[derive(Debug, Clone)]
pub struct ProjectAnalyzer {
    /// 子コンポーネント参照とみなすタグ名の接頭辞
    component_prefix: String,
    route_analyzer: RouteAnalyzer,
    template_analyzer: TemplateAnalyzer,
    logic_analyzer: BusinessLogicAnalyzer,
}

impl Default for ProjectAnalyzer {
    fn default() -> Self {
        Self {
            component_prefix: "app-".to_string(),
            route_analyzer: RouteAnalyzer::default(),
            template_analyzer: TemplateAnalyzer::default(),
            logic_analyzer: BusinessLogicAnalyzer::new(),
        }
    }
}

impl ProjectAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.component_prefix = prefix.into();
        self
    }

    /// プロジェクトを解析して構造モデルを返す
    pub fn analyze(&self, project_root: &Path, routing_file: &Path) -> Result<AnalysisResult> {
        // 1) ルーティング宣言からルートマップを構築
        let route_map = self.route_analyzer.analyze_file(routing_file)?;
        info!(
            components = route_map.components.len(),
            redirections = route_map.redirections.len(),
            "ルートマップ構築完了"
        );

        // 2) ソースツリーの全 .ts ファイルからコンポーネント宣言を収集
        let mut component_map = Vec::new();
        for source_path in collect_ts_files(project_root) {
            let parsed = parse_ts_file(&source_path)?;
            for decl in find_component_decls(&parsed) {
                let entry = self.analyze_component(&decl, &source_path, &parsed, &route_map)?;
                component_map.push(entry);
            }
        }

        Ok(AnalysisResult {
            route_map,
            component_map,
        })
    }

    /// コンポーネント 1 個分の解析
    fn analyze_component(
        &self,
        decl: &ComponentDecl,
        source_path: &Path,
        parsed: &ParsedSource,
        route_map: &RouteMap,
    ) -> Result<ComponentEntry> {
        debug!(class = %decl.class_name, file = %source_path.display(), "コンポーネント解析");

        // selector が無いコンポーネントは解析全体を中断する
        let selector = decl
            .selector
            .clone()
            .ok_or_else(|| AnalyzerError::MissingSelector {
                component: decl.class_name.clone(),
                file: source_path.to_path_buf(),
            })?;

        // テンプレート解決: インライン優先、無ければ templateUrl を
        // 宣言ファイルのディレクトリ基準で読む。どちらも無ければ致命
        let template_source = match (&decl.template, &decl.template_url) {
            (Some(inline), _) => inline.clone(),
            (None, Some(url)) => {
                let path = resolve_template_path(url, source_path)?;
                fs::read_to_string(&path).map_err(|source| AnalyzerError::TemplateUnreadable {
                    component: decl.class_name.clone(),
                    path,
                    source,
                })?
            }
            (None, None) => {
                return Err(AnalyzerError::MissingTemplate {
                    component: decl.class_name.clone(),
                    file: source_path.to_path_buf(),
                });
            }
        };

        let nodes = parse_template(&template_source)?;

        // ID ジェネレータはテンプレートごとに新規作成する
        // (連番 ID はテンプレート単位で 1 から始まる)
        let mut ids = WidgetIdGenerator::new();
        let mut widgets = self
            .template_analyzer
            .analyze(&nodes, &template_source, &mut ids);
        let nested_components = collect_nested_components(&nodes, &self.component_prefix);

        let widget_event_maps =
            self.logic_analyzer
                .analyze(&decl.class, parsed, route_map, &mut widgets);

        Ok(ComponentEntry {
            info: ComponentInfo {
                selector,
                widgets,
                nested_components,
            },
            widget_event_maps,
        })
    }
}

/// プロジェクトのソースツリーから解析対象の .ts ファイルを列挙する。
/// node_modules と型定義・テストファイルは対象外。
/// 結果の順序を安定させるためソートして返す
pub fn collect_ts_files(project_root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(project_root)
        .into_iter()
        .filter_entry(|e| e.file_name().to_str() != Some("node_modules"))
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path().extension().map_or(false, |ext| ext == "ts")
        })
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.ends_with(".d.ts") && !name.ends_with(".spec.ts")
        })
        .collect();
    files.sort();
    files
}

/// メインルーティングファイルを慣習的なファイル名から探す
pub fn find_routing_file(project_root: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = collect_ts_files(project_root)
        .into_iter()
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            ROUTING_FILE_SUFFIXES.iter().any(|s| name.ends_with(s))
        })
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::RoutingFileNotFound {
            root: project_root.to_path_buf(),
        })
}

/// モジュール内の @Component デコレータつきクラスを集める
fn find_component_decls(parsed: &ParsedSource) -> Vec<ComponentDecl> {
    struct ComponentVisitor {
        components: Vec<ComponentDecl>,
    }

    impl Visit for ComponentVisitor {
        fn visit_class_decl(&mut self, class_decl: &ClassDecl) {
            for decorator in &class_decl.class.decorators {
                if let Some(obj) = component_decorator_arg(decorator) {
                    let mut decl = ComponentDecl {
                        class_name: class_decl.ident.sym.to_string(),
                        selector: None,
                        template: None,
                        template_url: None,
                        class: (*class_decl.class).clone(),
                    };
                    read_component_metadata(obj, &mut decl);
                    self.components.push(decl);
                    break;
                }
            }
        }
    }

    let mut visitor = ComponentVisitor {
        components: Vec::new(),
    };
    visitor.visit_module(&parsed.module);
    visitor.components
}

/// `@Component({...})` のオブジェクトリテラル引数を取り出す
fn component_decorator_arg(decorator: &Decorator) -> Option<&ObjectLit> {
    let Expr::Call(call) = &*decorator.expr else {
        return None;
    };
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Ident(ident) = &**callee else {
        return None;
    };
    if &*ident.sym != "Component" {
        return None;
    }
    match call.args.first() {
        Some(arg) => match &*arg.expr {
            Expr::Object(obj) => Some(obj),
            _ => None,
        },
        None => None,
    }
}

/// selector / template / templateUrl をデコレータ引数から読む
fn read_component_metadata(obj: &ObjectLit, decl: &mut ComponentDecl) {
    for prop in &obj.props {
        let PropOrSpread::Prop(boxed_prop) = prop else {
            continue;
        };
        let Prop::KeyValue(KeyValueProp { key, value }) = &**boxed_prop else {
            continue;
        };
        let Some(key_name) = prop_name(key) else {
            continue;
        };
        match key_name.as_str() {
            "selector" => decl.selector = string_value(value),
            "template" => decl.template = string_value(value),
            "templateUrl" => decl.template_url = string_value(value),
            _ => {}
        }
    }
}

/// 文字列リテラルまたは式なしテンプレートリテラルの中身を取り出す
fn string_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() && tpl.quasis.len() == 1 => {
            let quasi = &tpl.quasis[0];
            Some(
                quasi
                    .cooked
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| quasi.raw.to_string()),
            )
        }
        _ => None,
    }
}
