// src/logic_analyzer.rs
//
// ビジネスロジック解析。
// コンポーネントクラスのメソッド本体を調べ、ウィジェットの各イベントを
// ハンドラに対応づけ、ハンドラ内の呼び出しを「ナビゲーション」
// 「バックエンド呼び出し」「その他」に分類してルートマップと照合する。
// あわせて FormGroup 初期化子からバリデーションルールを回収し、
// formControlName の一致するウィジェットへ追記する。

use std::collections::HashMap;

use swc_common::Spanned;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};
use tracing::{debug, warn};

use crate::model::{EventContext, EventHandlerCallContext, RouteMap, WidgetEventMap, WidgetInfo};
use crate::ts::{ParsedSource, prop_name};
use crate::widget_analyzer::ROUTER_LINK_EVENT;

/// バックエンド呼び出しの合成ターゲット
pub const BACKEND_TARGET: &str = "/backend";

/// 呼び出し分類の判定器。
/// 既定実装は意図的に素朴な部分文字列一致であり、
/// 差し替え可能にするためトレイトとして切り出してある
pub trait CallClassifier {
    fn is_navigation_call(&self, callee_text: &str) -> bool;
    fn is_backend_call(&self, callee_text: &str) -> bool;
}

/// 既定の判定器。
/// "navigate" / "service" の部分文字列一致なので、似た名前の
/// メソッドを誤判定しうる (既知の弱点)
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringClassifier;

impl CallClassifier for SubstringClassifier {
    fn is_navigation_call(&self, callee_text: &str) -> bool {
        callee_text.contains("navigate")
    }

    fn is_backend_call(&self, callee_text: &str) -> bool {
        callee_text.to_ascii_lowercase().contains("service")
    }
}

#[derive(Debug, Clone, Default)]
pub struct BusinessLogicAnalyzer<C: CallClassifier = SubstringClassifier> {
    classifier: C,
}

impl BusinessLogicAnalyzer<SubstringClassifier> {
    pub fn new() -> Self {
        Self {
            classifier: SubstringClassifier,
        }
    }
}

impl<C: CallClassifier> BusinessLogicAnalyzer<C> {
    pub fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }

    /// ウィジェット一覧とルートマップを突き合わせて
    /// イベント→呼び出しの解決結果を作る。
    /// `widgets` の validationRules はここで追記される
    pub fn analyze(
        &self,
        class: &Class,
        parsed: &ParsedSource,
        route_map: &RouteMap,
        widgets: &mut [WidgetInfo],
    ) -> Vec<WidgetEventMap> {
        let methods = method_index(class);
        let mut maps = Vec::new();

        for widget in widgets.iter() {
            let mut contexts = Vec::new();
            for binding in &widget.events {
                // routerLink は疑似イベントなのでハンドラ解決しない
                if binding.event == ROUTER_LINK_EVENT {
                    continue;
                }
                let method_name = binding.handler.split('(').next().unwrap_or("").trim();
                let Some(function) = methods.get(method_name) else {
                    warn!(
                        widget = %widget.id,
                        event = %binding.event,
                        handler = %method_name,
                        "ハンドラメソッドがクラス内に見つかりません"
                    );
                    continue;
                };

                let mut calls: Vec<EventHandlerCallContext> = Vec::new();
                for call in collect_calls(function) {
                    let ctx = self.classify_call(&call, parsed, route_map);
                    merge_call(&mut calls, ctx);
                }
                // 呼び出しが 1 件も無いイベントは記録しない
                if !calls.is_empty() {
                    contexts.push(EventContext {
                        event: binding.event.clone(),
                        handler: binding.handler.clone(),
                        calls,
                    });
                }
            }
            if !contexts.is_empty() {
                maps.push(WidgetEventMap {
                    widget_id: widget.id.clone(),
                    events: contexts,
                });
            }
        }

        // FormGroup 初期化子との照合でバリデーションルールを追記
        let rules_by_control = collect_validation_rules(class, parsed);
        for widget in widgets.iter_mut() {
            if let Some(control) = widget.attributes.get("formControlName") {
                if let Some(rules) = rules_by_control.get(control) {
                    debug!(widget = %widget.id, control = %control, ?rules, "バリデーションルールを追記");
                    widget.validation_rules.extend(rules.iter().cloned());
                }
            }
        }

        maps
    }

    /// 呼び出し 1 件を分類する
    fn classify_call(
        &self,
        call: &CallExpr,
        parsed: &ParsedSource,
        route_map: &RouteMap,
    ) -> EventHandlerCallContext {
        let caller = match &call.callee {
            Callee::Expr(expr) => parsed.snippet(expr.span()),
            _ => String::new(),
        };

        if self.classifier.is_navigation_call(&caller) {
            if let Some(resolved) = resolve_navigation(call, &caller, parsed, route_map) {
                return resolved;
            }
        }
        if self.classifier.is_backend_call(&caller) {
            return EventHandlerCallContext {
                caller,
                called: BACKEND_TARGET.to_string(),
                data: Vec::new(),
            };
        }
        EventHandlerCallContext {
            caller,
            called: String::new(),
            data: Vec::new(),
        }
    }
}

/// navigate(['/base', arg1, …]) 形式の呼び出しをルートマップと照合する。
/// 配列リテラル 1 引数でなければ分類不能として None
fn resolve_navigation(
    call: &CallExpr,
    caller: &str,
    parsed: &ParsedSource,
    route_map: &RouteMap,
) -> Option<EventHandlerCallContext> {
    if call.args.len() != 1 {
        return None;
    }
    let Expr::Array(arr) = &*call.args[0].expr else {
        return None;
    };
    let mut elems = arr.elems.iter().flatten();
    let base = match elems.next() {
        Some(first) => match &*first.expr {
            Expr::Lit(Lit::Str(s)) => s.value.to_string(),
            _ => return None,
        },
        None => return None,
    };
    let params: Vec<String> = elems.map(|e| parsed.snippet(e.expr.span())).collect();

    // 前方一致候補のうち、動的セグメント数が引数数と一致する最初の
    // ルートを採用する (親ルートが動的子ルートを前方一致で覆い隠すため)
    let resolved = route_map
        .find_by_prefix(&base)
        .find(|rc| dynamic_segment_count(&rc.route) == params.len())
        .map(|rc| rc.route.clone());
    if resolved.is_none() {
        debug!(
            base = %base,
            params = params.len(),
            "動的セグメント数が引数数と一致するルートがないため未解決のまま記録"
        );
    }

    match resolved {
        Some(route) => Some(EventHandlerCallContext {
            caller: caller.to_string(),
            called: route,
            data: params,
        }),
        // 未解決でも呼び出し自体は記録する (data は空)
        None => Some(EventHandlerCallContext {
            caller: caller.to_string(),
            called: String::new(),
            data: Vec::new(),
        }),
    }
}

/// ルートパス中の `:param` セグメント数
fn dynamic_segment_count(route: &str) -> usize {
    route.split('/').filter(|seg| seg.starts_with(':')).count()
}

/// `caller -> called` をキーに重複を除去する。
/// 衝突時は data の長いほう (メタデータの多いほう) を残す
fn merge_call(calls: &mut Vec<EventHandlerCallContext>, ctx: EventHandlerCallContext) {
    if let Some(existing) = calls
        .iter_mut()
        .find(|c| c.caller == ctx.caller && c.called == ctx.called)
    {
        if ctx.data.len() > existing.data.len() {
            *existing = ctx;
        }
        return;
    }
    calls.push(ctx);
}

/// クラスのメソッド名→本体のインデックスを作る
fn method_index(class: &Class) -> HashMap<String, &Function> {
    let mut index = HashMap::new();
    for member in &class.body {
        if let ClassMember::Method(method) = member {
            if let Some(name) = prop_name(&method.key) {
                index.insert(name, &*method.function);
            }
        }
    }
    index
}

/// 関数本体の中の呼び出し式を (入れ子も含めて) 集める
fn collect_calls(function: &Function) -> Vec<CallExpr> {
    struct CallCollector {
        calls: Vec<CallExpr>,
    }
    impl Visit for CallCollector {
        fn visit_call_expr(&mut self, call: &CallExpr) {
            self.calls.push(call.clone());
            call.visit_children_with(self);
        }
    }
    let mut collector = CallCollector { calls: Vec::new() };
    function.visit_with(&mut collector);
    collector.calls
}

/// FormGroup 初期化子からコントロール名→バリデーションルールを集める。
/// 対象はオブジェクトリテラル 1 引数の `….group({...})` 呼び出し、
/// または `new FormGroup({...})`
fn collect_validation_rules(class: &Class, parsed: &ParsedSource) -> HashMap<String, Vec<String>> {
    struct FormGroupVisitor<'a> {
        parsed: &'a ParsedSource,
        rules: HashMap<String, Vec<String>>,
    }

    impl FormGroupVisitor<'_> {
        fn take_controls(&mut self, obj: &ObjectLit) {
            for prop in &obj.props {
                let PropOrSpread::Prop(boxed_prop) = prop else {
                    continue;
                };
                let Prop::KeyValue(KeyValueProp { key, value }) = &**boxed_prop else {
                    continue;
                };
                let Some(control) = prop_name(key) else {
                    continue;
                };
                if let Expr::Array(arr) = &**value {
                    let mut found = Vec::new();
                    collect_rules_from_array(arr, self.parsed, &mut found);
                    if !found.is_empty() {
                        self.rules.insert(control, found);
                    }
                }
            }
        }
    }

    impl Visit for FormGroupVisitor<'_> {
        fn visit_call_expr(&mut self, call: &CallExpr) {
            if let Callee::Expr(expr) = &call.callee {
                let callee_text = self.parsed.snippet(expr.span());
                if (callee_text.ends_with(".group") || callee_text == "group")
                    && call.args.len() == 1
                {
                    if let Expr::Object(obj) = &*call.args[0].expr {
                        self.take_controls(obj);
                    }
                }
            }
            call.visit_children_with(self);
        }

        fn visit_new_expr(&mut self, new_expr: &NewExpr) {
            if let Expr::Ident(ident) = &*new_expr.callee {
                if &*ident.sym == "FormGroup" {
                    if let Some(args) = &new_expr.args {
                        if let Some(first) = args.first() {
                            if let Expr::Object(obj) = &*first.expr {
                                self.take_controls(obj);
                            }
                        }
                    }
                }
            }
            new_expr.visit_children_with(self);
        }
    }

    let mut visitor = FormGroupVisitor {
        parsed,
        rules: HashMap::new(),
    };
    class.visit_with(&mut visitor);
    visitor.rules
}

/// コントロール初期化子の配列要素からルール識別子を取り出す。
/// `['', [Validators.required, Validators.email]]` のような
/// 入れ子配列にも対応する
fn collect_rules_from_array(arr: &ArrayLit, parsed: &ParsedSource, out: &mut Vec<String>) {
    for elem in arr.elems.iter().flatten() {
        if let Expr::Array(inner) = &*elem.expr {
            collect_rules_from_array(inner, parsed, out);
            continue;
        }
        let text = parsed.snippet(elem.expr.span());
        if text.contains("Validators") {
            out.push(rule_identifier(&text));
        }
    }
}

/// `Validators.pattern('[0-9]+')` → `pattern` のように
/// ルール識別子へ正規化する
fn rule_identifier(text: &str) -> String {
    let stripped = text.strip_prefix("Validators.").unwrap_or(text);
    match stripped.find('(') {
        Some(idx) => stripped[..idx].trim().to_string(),
        None => stripped.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_template;
    use crate::ts::parse_ts_source;
    use crate::widget_analyzer::TemplateAnalyzer;
    use crate::widget_id::WidgetIdGenerator;
    use pretty_assertions::assert_eq;
    use swc_common::FileName;

    /// ソース中の最初のクラスを取り出すテスト用ヘルパー
    fn first_class(parsed: &ParsedSource) -> Class {
        struct ClassFinder {
            class: Option<Class>,
        }
        impl Visit for ClassFinder {
            fn visit_class(&mut self, class: &Class) {
                if self.class.is_none() {
                    self.class = Some(class.clone());
                }
            }
        }
        let mut finder = ClassFinder { class: None };
        finder.visit_module(&parsed.module);
        finder.class.expect("クラスがあるはず")
    }

    fn widgets_of(template: &str) -> Vec<WidgetInfo> {
        let nodes = parse_template(template).unwrap();
        let mut ids = WidgetIdGenerator::new();
        TemplateAnalyzer::default().analyze(&nodes, template, &mut ids)
    }

    fn route_map_items() -> RouteMap {
        RouteMap {
            components: vec![
                crate::model::RouteComponent {
                    component: "HomeComponent".to_string(),
                    route: "home".to_string(),
                },
                crate::model::RouteComponent {
                    component: "ListComponent".to_string(),
                    route: "items".to_string(),
                },
                crate::model::RouteComponent {
                    component: "DetailComponent".to_string(),
                    route: "items/:id".to_string(),
                },
            ],
            redirections: Vec::new(),
        }
    }

    fn analyze(template: &str, class_src: &str) -> (Vec<WidgetInfo>, Vec<WidgetEventMap>) {
        let parsed =
            parse_ts_source(FileName::Custom("test.ts".to_string()), class_src.to_string())
                .unwrap();
        let class = first_class(&parsed);
        let mut widgets = widgets_of(template);
        let maps = BusinessLogicAnalyzer::new().analyze(
            &class,
            &parsed,
            &route_map_items(),
            &mut widgets,
        );
        (widgets, maps)
    }

    #[test]
    fn navigation_call_resolves_dynamic_route() {
        let (_, maps) = analyze(
            r#"<button (click)="open(item)">Open</button>"#,
            r#"
            export class ListComponent {
                open(item) {
                    this.router.navigate(['/items', item.id]);
                }
            }
            "#,
        );
        assert_eq!(maps.len(), 1);
        let calls = &maps[0].events[0].calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].caller, "this.router.navigate");
        assert_eq!(calls[0].called, "items/:id");
        assert_eq!(calls[0].data, vec!["item.id"]);
    }

    #[test]
    fn parameter_count_mismatch_stays_unresolved() {
        let (_, maps) = analyze(
            r#"<button (click)="open(item)">Open</button>"#,
            r#"
            export class ListComponent {
                open(item) {
                    this.router.navigate(['/home', item.id]);
                }
            }
            "#,
        );
        let calls = &maps[0].events[0].calls;
        assert_eq!(calls[0].called, "");
        assert!(calls[0].data.is_empty());
    }

    /// 親ルート `items` が子ルート `items/:id` より先に宣言されていても、
    /// 引数つき navigate は動的セグメント数の一致する子ルートへ解決される
    #[test]
    fn parent_route_does_not_shadow_dynamic_child() {
        let (_, maps) = analyze(
            r#"<button (click)="open(item)">Open</button>"#,
            r#"
            export class ListComponent {
                open(item) {
                    this.router.navigate(['/items', item.id]);
                }
            }
            "#,
        );
        let calls = &maps[0].events[0].calls;
        assert_eq!(calls[0].called, "items/:id");
        assert_eq!(calls[0].data, vec!["item.id"]);
    }

    #[test]
    fn zero_params_resolve_to_parent_route() {
        let (_, maps) = analyze(
            r#"<button (click)="openList()">List</button>"#,
            r#"
            export class ListComponent {
                openList() {
                    this.router.navigate(['/items']);
                }
            }
            "#,
        );
        assert_eq!(maps[0].events[0].calls[0].called, "items");
    }

    #[test]
    fn plain_route_without_params_resolves() {
        let (_, maps) = analyze(
            r#"<button (click)="goHome()">Home</button>"#,
            r#"
            export class ListComponent {
                goHome() {
                    this.router.navigate(['/home']);
                }
            }
            "#,
        );
        assert_eq!(maps[0].events[0].calls[0].called, "home");
    }

    #[test]
    fn service_call_maps_to_backend() {
        let (_, maps) = analyze(
            r#"<button (click)="save()">Save</button>"#,
            r#"
            export class EditComponent {
                save() {
                    this.userService.save(this.user);
                }
            }
            "#,
        );
        let calls = &maps[0].events[0].calls;
        assert_eq!(calls[0].called, BACKEND_TARGET);
        assert!(calls[0].data.is_empty());
    }

    #[test]
    fn missing_handler_is_skipped_without_panic() {
        let (_, maps) = analyze(
            r#"<button (click)="doesNotExist()">x</button>"#,
            "export class EmptyComponent {}",
        );
        assert!(maps.is_empty());
    }

    #[test]
    fn duplicate_calls_are_merged_keeping_longer_data() {
        let (_, maps) = analyze(
            r#"<button (click)="open(item)">Open</button>"#,
            r#"
            export class ListComponent {
                open(item) {
                    this.router.navigate(['/items', item.id]);
                    this.router.navigate(['/items', item.id]);
                }
            }
            "#,
        );
        assert_eq!(maps[0].events[0].calls.len(), 1);
        assert_eq!(maps[0].events[0].calls[0].data, vec!["item.id"]);
    }

    #[test]
    fn unclassified_call_is_recorded_with_empty_target() {
        let (_, maps) = analyze(
            r#"<button (click)="log()">x</button>"#,
            r#"
            export class LogComponent {
                log() {
                    console.log('hello');
                }
            }
            "#,
        );
        let calls = &maps[0].events[0].calls;
        assert_eq!(calls[0].caller, "console.log");
        assert_eq!(calls[0].called, "");
    }

    #[test]
    fn validation_rules_are_backfilled_by_control_name() {
        let (widgets, _) = analyze(
            r#"<form><input formControlName="email"></form>"#,
            r#"
            export class SignupComponent {
                ngOnInit() {
                    this.form = this.formBuilder.group({
                        email: ['', [Validators.required, Validators.email]],
                        name: [''],
                    });
                }
            }
            "#,
        );
        let email = widgets
            .iter()
            .find(|w| w.attributes.get("formControlName").map(String::as_str) == Some("email"))
            .unwrap();
        assert_eq!(email.validation_rules, vec!["required", "email"]);
    }

    #[test]
    fn new_form_group_initializer_is_recognized() {
        let (widgets, _) = analyze(
            r#"<form><input formControlName="age"></form>"#,
            r#"
            export class ProfileComponent {
                constructor() {
                    this.form = new FormGroup({
                        age: ['', Validators.min(0)],
                    });
                }
            }
            "#,
        );
        let age = widgets
            .iter()
            .find(|w| w.attributes.get("formControlName").map(String::as_str) == Some("age"))
            .unwrap();
        assert_eq!(age.validation_rules, vec!["min"]);
    }
}
