// src/route_analyzer.rs
//
// ルーティング宣言ファイルの解析。
// ルート配列を再帰下降で歩き、`{component, route}` と
// `{route, redirectTo}` をフラットなルートマップに畳み込む。
// loadChildren の遅延ロード先も file_resolver 経由でたどる。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use swc_common::Spanned;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};
use tracing::{debug, warn};

use crate::error::Result;
use crate::file_resolver::resolve_load_children_path;
use crate::model::{Redirection, RouteComponent, RouteMap};
use crate::ts::{ParsedSource, parse_ts_file, prop_name};

/// ルート配列 1 要素分の生の抽出結果 (ファイル単位の中間表現)
#[derive(Debug, Clone, Default)]
struct RouteEntry {
    path: Option<String>,
    /// 動的セグメント名 (params プロパティ)。あれば `/:name` を付加する
    param: Option<String>,
    component: Option<String>,
    redirect_to: Option<String>,
    children: Vec<RouteEntry>,
    /// loadChildren 式のソーステキスト
    load_children: Option<String>,
}

/// ルーティング宣言の解析器。
/// ルート配列を保持していると認識する変数名の集合を設定できる
#[derive(Debug, Clone)]
pub struct RouteAnalyzer {
    recognized_vars: Vec<String>,
}

impl Default for RouteAnalyzer {
    fn default() -> Self {
        // 慣習的な 2 つの変数名を既定とする
        Self {
            recognized_vars: vec!["routes".to_string(), "appRoutes".to_string()],
        }
    }
}

impl RouteAnalyzer {
    pub fn with_recognized_vars<I: IntoIterator<Item = String>>(vars: I) -> Self {
        Self {
            recognized_vars: vars.into_iter().collect(),
        }
    }

    /// ルーティングファイルを解析してルートマップを構築する
    pub fn analyze_file(&self, routing_path: &Path) -> Result<RouteMap> {
        let mut map = RouteMap::default();
        let mut seen = HashSet::new();
        self.analyze_into(routing_path, "", &mut map, &mut seen)?;
        Ok(map)
    }

    fn analyze_into(
        &self,
        routing_path: &Path,
        parent_path: &str,
        map: &mut RouteMap,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        if !seen.insert(routing_path.to_path_buf()) {
            // 循環する loadChildren は一度だけたどる
            return Ok(());
        }
        debug!(file = %routing_path.display(), "ルーティングファイル解析");

        let parsed = parse_ts_file(routing_path)?;
        let entries = collect_route_entries(&parsed, &self.recognized_vars);
        for entry in &entries {
            self.record(entry, parent_path, routing_path, map, seen)?;
        }
        Ok(())
    }

    /// ルート要素 1 個分をルートマップへ畳み込む (再帰下降)
    fn record(
        &self,
        entry: &RouteEntry,
        parent_path: &str,
        routing_path: &Path,
        map: &mut RouteMap,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        // path を持たない要素は途中結果も残さず丸ごとスキップ
        let Some(path) = &entry.path else {
            return Ok(());
        };

        let mut full_path = if parent_path.is_empty() {
            path.clone()
        } else {
            format!("{parent_path}/{path}")
        };
        if let Some(param) = &entry.param {
            full_path = format!("{full_path}/:{param}");
        }

        if let Some(component) = &entry.component {
            map.components.push(RouteComponent {
                component: component.clone(),
                route: full_path.clone(),
            });
        }
        // redirectTo は component 対応とは独立に記録する (併存あり)
        if let Some(redirect_to) = &entry.redirect_to {
            map.redirections.push(Redirection {
                route: full_path.clone(),
                redirect_to: redirect_to.clone(),
            });
        }

        for child in &entry.children {
            self.record(child, &full_path, routing_path, map, seen)?;
        }

        // loadChildren があれば実ファイルを探して再帰的に解析する
        if let Some(load_str) = &entry.load_children {
            match resolve_load_children_path(load_str, routing_path)? {
                Some(sub_path) => {
                    self.analyze_into(&sub_path, &full_path, map, seen)?;
                }
                None => {
                    debug!(
                        expr = %load_str,
                        "loadChildren の対象ファイルが見つからないため子ルートなしとみなす"
                    );
                }
            }
        }
        Ok(())
    }
}

/// パース済みモジュールからルート配列を収集する
fn collect_route_entries(parsed: &ParsedSource, recognized_vars: &[String]) -> Vec<RouteEntry> {
    let mut visitor = RouteVisitor {
        parsed,
        route_variables: HashMap::new(),
        var_order: Vec::new(),
        routes: Vec::new(),
    };
    visitor.visit_module(&parsed.module);

    // RouterModule.forRoot / forChild から拾えたものを優先し、
    // 無ければ認識済み変数名の配列を宣言順に採用する
    if !visitor.routes.is_empty() {
        return visitor.routes;
    }
    let mut entries = Vec::new();
    for name in &visitor.var_order {
        if recognized_vars.iter().any(|r| r == name) {
            if let Some(found) = visitor.route_variables.get(name) {
                entries.extend(found.iter().cloned());
            }
        }
    }
    if entries.is_empty() {
        warn!("ルート配列が見つかりませんでした");
    }
    entries
}

/// AST をトラバースしてルート定義を抽出するための Visitor
struct RouteVisitor<'a> {
    parsed: &'a ParsedSource,
    /// 変数名とそのルート配列のマッピング
    route_variables: HashMap<String, Vec<RouteEntry>>,
    /// 変数の宣言順
    var_order: Vec<String>,
    /// RouterModule.forRoot / forChild 経由で見つかったルート
    routes: Vec<RouteEntry>,
}

impl RouteVisitor<'_> {
    /// ObjectLit (例: `{ path: "home", component: HomeComponent }`) を
    /// RouteEntry に変換するヘルパー
    fn parse_route_object(&self, obj_lit: &ObjectLit) -> RouteEntry {
        let mut entry = RouteEntry::default();

        for prop in &obj_lit.props {
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
                "path" => {
                    if let Expr::Lit(Lit::Str(Str { value: s, .. })) = &**value {
                        entry.path = Some(s.to_string());
                    }
                }
                "params" => {
                    if let Expr::Lit(Lit::Str(Str { value: s, .. })) = &**value {
                        entry.param = Some(s.to_string());
                    }
                }
                "component" => {
                    if let Expr::Ident(ident) = &**value {
                        entry.component = Some(ident.sym.to_string());
                    }
                }
                "redirectTo" => {
                    if let Expr::Lit(Lit::Str(Str { value: s, .. })) = &**value {
                        entry.redirect_to = Some(s.to_string());
                    }
                }
                "children" => {
                    if let Expr::Array(arr_lit) = &**value {
                        entry.children = self.extract_routes_from_array(arr_lit);
                    }
                }
                "loadChildren" => match &**value {
                    Expr::Arrow(_) | Expr::Lit(Lit::Str(_)) => {
                        entry.load_children = Some(self.parsed.snippet(value.span()));
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        entry
    }

    /// 配列リテラルからルート情報を抽出する
    fn extract_routes_from_array(&self, arr_lit: &ArrayLit) -> Vec<RouteEntry> {
        let mut routes = Vec::new();
        for elem in arr_lit.elems.iter().flatten() {
            if let Expr::Object(obj_lit) = &*elem.expr {
                routes.push(self.parse_route_object(obj_lit));
            }
        }
        routes
    }
}

impl Visit for RouteVisitor<'_> {
    /// 変数宣言をキャッチして、ルート配列らしきものを記録する
    fn visit_var_decl(&mut self, var_decl: &VarDecl) {
        for declarator in &var_decl.decls {
            if let Pat::Ident(BindingIdent { id, .. }) = &declarator.name {
                let var_name = id.sym.to_string();
                if let Some(init_expr) = &declarator.init {
                    if let Expr::Array(arr_lit) = &**init_expr {
                        let entries = self.extract_routes_from_array(arr_lit);
                        if !entries.is_empty() {
                            debug!(var = %var_name, count = entries.len(), "ルート配列の変数宣言を発見");
                            self.route_variables.insert(var_name.clone(), entries);
                            self.var_order.push(var_name);
                        }
                    }
                }
            }
        }
        var_decl.visit_children_with(self);
    }

    /// RouterModule.forRoot / forChild の引数からルート配列を拾う
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Callee::Expr(expr) = &call.callee {
            if let Expr::Member(MemberExpr { obj, prop, .. }) = &**expr {
                if let (Expr::Ident(obj_ident), MemberProp::Ident(prop_ident)) =
                    (&**obj, prop)
                {
                    let is_router_module = &*obj_ident.sym == "RouterModule";
                    let method_name = prop_ident.sym.to_string();
                    if is_router_module
                        && (method_name == "forRoot" || method_name == "forChild")
                        && call.args.len() == 1
                    {
                        match &*call.args[0].expr {
                            // 直接配列リテラルの場合
                            Expr::Array(arr_lit) => {
                                let extracted = self.extract_routes_from_array(arr_lit);
                                self.routes.extend(extracted);
                            }
                            // 変数参照の場合
                            Expr::Ident(ident) => {
                                let var_name = ident.sym.to_string();
                                if let Some(entries) = self.route_variables.get(&var_name) {
                                    self.routes.extend(entries.iter().cloned());
                                } else {
                                    warn!(var = %var_name, "変数の定義が見つかりません");
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        call.visit_children_with(self);
    }
}
