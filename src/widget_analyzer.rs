// src/widget_analyzer.rs
//
// テンプレート/ウィジェット解析。
// パース済みテンプレートツリーを深さ優先で走査し、対話的要素
// (ボタン・リンク・フォーム部品など) を WidgetInfo として抽出する。
// ハンドラ式のテキストは属性値のバイト範囲を使って元ソースから
// そのまま切り出す。

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::model::{EventBinding, WidgetInfo};
use crate::template::{AttrKind, ElementNode, TemplateNode};
use crate::widget_id::WidgetIdGenerator;

/// 予約イベント名。ハンドラ欄には遷移先文字列がそのまま入る
pub const ROUTER_LINK_EVENT: &str = "routerLink";

/// バリデーション属性。存在すればその名前がルール識別子になる
const VALIDATION_ATTRS: &[&str] = &["required", "pattern", "min", "max"];

/// 対話的要素とみなすタグの許可リストを持つアナライザ
#[derive(Debug, Clone)]
pub struct TemplateAnalyzer {
    interactive_tags: HashSet<String>,
}

impl Default for TemplateAnalyzer {
    fn default() -> Self {
        let tags = [
            "button",
            "a",
            "input",
            "form",
            "select",
            "textarea",
            "mat-checkbox",
            "mat-radio-group",
            "mat-button-toggle-group",
            "mat-slide-toggle",
            "mat-select",
        ];
        Self {
            interactive_tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl TemplateAnalyzer {
    /// 許可リストを差し替えたアナライザを作る
    pub fn with_tags<I: IntoIterator<Item = String>>(tags: I) -> Self {
        Self {
            interactive_tags: tags
                .into_iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
        }
    }

    /// テンプレートツリーからウィジェットを抽出する。
    /// ID ジェネレータは呼び出し側がテンプレートごとに用意する
    pub fn analyze(
        &self,
        nodes: &[TemplateNode],
        source: &str,
        ids: &mut WidgetIdGenerator,
    ) -> Vec<WidgetInfo> {
        let mut widgets = Vec::new();
        self.walk(nodes, source, ids, &mut widgets);
        widgets
    }

    fn walk(
        &self,
        nodes: &[TemplateNode],
        source: &str,
        ids: &mut WidgetIdGenerator,
        widgets: &mut Vec<WidgetInfo>,
    ) {
        for node in nodes {
            let TemplateNode::Element(element) = node else {
                continue;
            };
            if self
                .interactive_tags
                .contains(&element.name.to_ascii_lowercase())
            {
                let widget = extract_widget(element, source, ids);
                debug!(id = %widget.id, tag = %widget.widget_type, "ウィジェット抽出");
                widgets.push(widget);
            }
            // 非対話的なコンテナの内側も走査する
            self.walk(&element.children, source, ids, widgets);
        }
    }
}

/// 対話的要素 1 個分の WidgetInfo を組み立てる
fn extract_widget(
    element: &ElementNode,
    source: &str,
    ids: &mut WidgetIdGenerator,
) -> WidgetInfo {
    let tag = element.name.to_ascii_lowercase();

    // 明示 id 属性があればそれを優先し、無ければ生成する
    let id = match element.static_attr("id") {
        Some(explicit) if !explicit.trim().is_empty() => explicit.to_string(),
        _ => ids.generate(element),
    };

    let mut events = Vec::new();

    // routerLink は静的属性・バインディングのどちらでも現れる
    if let Some(target) = router_link_target(element) {
        events.push(EventBinding {
            event: ROUTER_LINK_EVENT.to_string(),
            handler: target,
        });
    }

    // (event)="handler(...)" のハンドラ式を元ソースから切り出す
    for attr in &element.attributes {
        if attr.kind != AttrKind::Output {
            continue;
        }
        let Some((lo, hi)) = attr.value_span else {
            continue;
        };
        let raw = &source[lo..hi];
        let handler = raw.trim().trim_end_matches("()").trim().to_string();
        events.push(EventBinding {
            event: attr.name.clone(),
            handler,
        });
    }

    // 静的属性をそのまま回収。input は type 省略時に "text" を補う
    let mut attributes: BTreeMap<String, String> = element
        .attributes
        .iter()
        .filter(|a| a.kind == AttrKind::Static)
        .map(|a| (a.name.clone(), a.value.clone().unwrap_or_default()))
        .collect();
    if tag == "input" {
        attributes
            .entry("type".to_string())
            .or_insert_with(|| "text".to_string());
    }

    let validation_rules = VALIDATION_ATTRS
        .iter()
        .filter(|name| attributes.contains_key(**name))
        .map(|name| name.to_string())
        .collect();

    let triggers_form_submission =
        tag == "button" && attributes.get("type").map(String::as_str) == Some("submit");

    WidgetInfo {
        id,
        widget_type: tag,
        events,
        attributes,
        validation_rules,
        triggers_form_submission,
    }
}

/// routerLink の遷移先を取り出して整形する。
/// バインディング式はシングルクォート内の最初のリテラルを抽出し、
/// 末尾のインライン注釈 (`| …`) は捨てる
fn router_link_target(element: &ElementNode) -> Option<String> {
    let raw = element
        .static_attr(ROUTER_LINK_EVENT)
        .map(str::to_string)
        .or_else(|| {
            element
                .attr(AttrKind::Property, ROUTER_LINK_EVENT)
                .and_then(|a| a.value.clone())
        })?;
    Some(clean_router_link(&raw))
}

fn clean_router_link(raw: &str) -> String {
    // 最初のシングルクォートで囲まれたリテラルを優先する
    if let Some(start) = raw.find('\'') {
        if let Some(len) = raw[start + 1..].find('\'') {
            return raw[start + 1..start + 1 + len].to_string();
        }
    }
    // 注釈サフィックス (例: "… | annotation") を落とす
    match raw.find('|') {
        Some(idx) => raw[..idx].trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// テンプレート内で参照されている子コンポーネントのタグ名を集める。
/// 命名規約 (接頭辞、既定では "app-") を持つ要素名が対象
pub fn collect_nested_components(nodes: &[TemplateNode], prefix: &str) -> Vec<String> {
    let mut found = Vec::new();
    collect_nested_inner(nodes, prefix, &mut found);
    found
}

fn collect_nested_inner(nodes: &[TemplateNode], prefix: &str, found: &mut Vec<String>) {
    for node in nodes {
        if let TemplateNode::Element(element) = node {
            let name = element.name.to_ascii_lowercase();
            if name.starts_with(prefix) && !found.contains(&name) {
                found.push(name);
            }
            collect_nested_inner(&element.children, prefix, found);
        }
    }
}
