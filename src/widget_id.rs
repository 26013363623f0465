// src/widget_id.rs
//
// ウィジェット ID ジェネレータ。
// 不透明な連番よりも、テンプレート内容に由来する人間に判読可能な
// 名前を優先して ID を割り当てる。最終手段としてタグ種別ごとの
// 出現カウンタを使う。カウンタの寿命はジェネレータのインスタンス
// 単位であり、オーケストレータはテンプレートごとに新しいインスタンス
// を作る (つまり連番はテンプレート単位でリセットされる)。

use std::collections::HashMap;

use crate::template::{AttrKind, ElementNode};

/// 連番しか使えなくなったときの最終手段の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    /// 直下のテキスト子ノード → それも無ければ連番
    TextContent,
    /// 最初のデータバインディング式の先頭トークン → 連番
    FirstBinding,
    /// 連番のみ
    Counter,
}

/// タグカテゴリごとの ID 生成戦略。
/// 属性の探索順と最終手段をデータとして持つ
struct IdStrategy {
    attributes: &'static [&'static str],
    fallback: Fallback,
}

const BUTTON_STRATEGY: IdStrategy = IdStrategy {
    attributes: &["name", "value", "formControlName"],
    fallback: Fallback::TextContent,
};
const ANCHOR_STRATEGY: IdStrategy = IdStrategy {
    attributes: &["routerLink", "href", "name", "formControlName", "value"],
    fallback: Fallback::TextContent,
};
const INPUT_STRATEGY: IdStrategy = IdStrategy {
    attributes: &["name", "formControlName", "value", "placeholder"],
    fallback: Fallback::TextContent,
};
const FORM_STRATEGY: IdStrategy = IdStrategy {
    attributes: &["name"],
    fallback: Fallback::FirstBinding,
};
const SELECT_STRATEGY: IdStrategy = IdStrategy {
    attributes: &["name", "formControlName"],
    fallback: Fallback::Counter,
};
const TEXTAREA_STRATEGY: IdStrategy = IdStrategy {
    attributes: &["name", "formControlName"],
    fallback: Fallback::Counter,
};
const OTHER_STRATEGY: IdStrategy = IdStrategy {
    attributes: &[],
    fallback: Fallback::TextContent,
};

/// タグ名から戦略を引く
fn strategy_for(tag: &str) -> &'static IdStrategy {
    match tag.to_ascii_lowercase().as_str() {
        "button" => &BUTTON_STRATEGY,
        "a" => &ANCHOR_STRATEGY,
        "input" | "mat-checkbox" | "mat-radio-group" | "mat-button-toggle-group"
        | "mat-slide-toggle" => &INPUT_STRATEGY,
        "form" => &FORM_STRATEGY,
        "select" | "mat-select" => &SELECT_STRATEGY,
        "textarea" => &TEXTAREA_STRATEGY,
        _ => &OTHER_STRATEGY,
    }
}

/// タグ種別ごとの出現カウンタを保持する ID ジェネレータ
#[derive(Debug, Default)]
pub struct WidgetIdGenerator {
    counters: HashMap<String, u32>,
}

impl WidgetIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 要素に対する ID を生成する。
    /// 同一タグのカウンタは ID を 1 つ生成するたびに 1 進む
    pub fn generate(&mut self, element: &ElementNode) -> String {
        let tag = element.name.to_ascii_uppercase();
        let strategy = strategy_for(&element.name);
        let n = self.next(&tag);

        // 1) 属性探索順に従ったコンテキスト ID
        for attr_name in strategy.attributes {
            if let Some(value) = contextual_value(element, attr_name) {
                return format!("{tag}__{}__{n}", normalize(&value));
            }
        }

        // 2) カテゴリごとの最終手段
        match strategy.fallback {
            Fallback::TextContent => {
                if let Some(text) = element.first_text_child() {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        return format!("{tag}__{}__{n}", normalize(trimmed));
                    }
                }
            }
            Fallback::FirstBinding => {
                let first_binding = element
                    .attributes
                    .iter()
                    .find(|a| a.kind == AttrKind::Property)
                    .and_then(|a| a.value.as_deref())
                    .and_then(first_token);
                if let Some(token) = first_binding {
                    return format!("{tag}__{}__{n}", normalize(&token));
                }
            }
            Fallback::Counter => {}
        }

        // 3) 記号的な連番 ID
        format!("{tag}__{n}")
    }

    fn next(&mut self, tag: &str) -> u32 {
        let counter = self.counters.entry(tag.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// 静的属性の値、なければ同名プロパティバインディング式の
/// 先頭トークンを返す
fn contextual_value(element: &ElementNode, name: &str) -> Option<String> {
    if let Some(value) = element.static_attr(name) {
        if !value.trim().is_empty() {
            return Some(value.to_string());
        }
    }
    element
        .attr(AttrKind::Property, name)
        .and_then(|a| a.value.as_deref())
        .and_then(first_token)
}

/// 式テキストの先頭の識別子的トークンを取り出す
/// (例: "['/detail', item.id]" → "detail"、"loginForm.value" → "loginForm")
fn first_token(expr: &str) -> Option<String> {
    let token: String = expr
        .chars()
        .skip_while(|c| !c.is_ascii_alphanumeric() && *c != '_')
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if token.is_empty() { None } else { Some(token) }
}

/// トリム後、空白とハイフンの連続をアンダースコア 1 つに置換し、
/// 小文字化する
fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_separator = false;
    for c in value.trim().chars() {
        if c.is_whitespace() || c == '-' {
            in_separator = true;
        } else {
            if in_separator && !out.is_empty() {
                out.push('_');
            }
            in_separator = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{TemplateNode, parse_template};
    use pretty_assertions::assert_eq;

    fn elements(src: &str) -> Vec<ElementNode> {
        parse_template(src)
            .unwrap()
            .into_iter()
            .filter_map(|n| match n {
                TemplateNode::Element(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn button_value_produces_contextual_id() {
        let els = elements(r#"<button value="save">Save</button>"#);
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "BUTTON__save__1");
    }

    #[test]
    fn plain_inputs_count_up_from_one() {
        let els = elements("<input><input>");
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "INPUT__1");
        assert_eq!(ids.generate(&els[1]), "INPUT__2");
    }

    #[test]
    fn counters_are_independent_per_tag() {
        let els = elements("<input><select></select><input>");
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "INPUT__1");
        assert_eq!(ids.generate(&els[1]), "SELECT__1");
        assert_eq!(ids.generate(&els[2]), "INPUT__2");
    }

    #[test]
    fn anchor_prefers_router_link_target() {
        let els = elements(r#"<a [routerLink]="['/detail', id]">Detail</a>"#);
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "A__detail__1");
    }

    #[test]
    fn form_falls_back_to_first_binding_token() {
        let els = elements(r#"<form [formGroup]="loginForm"></form>"#);
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "FORM__loginform__1");
    }

    #[test]
    fn select_has_no_text_fallback() {
        let els = elements("<select>choose</select>");
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "SELECT__1");
    }

    #[test]
    fn normalization_collapses_separators() {
        let els = elements(r#"<button name="  Save -  All "></button>"#);
        let mut ids = WidgetIdGenerator::new();
        assert_eq!(ids.generate(&els[0]), "BUTTON__save_all__1");
    }

    #[test]
    fn new_generator_resets_counters() {
        let els = elements("<input>");
        let mut first = WidgetIdGenerator::new();
        assert_eq!(first.generate(&els[0]), "INPUT__1");
        let mut second = WidgetIdGenerator::new();
        assert_eq!(second.generate(&els[0]), "INPUT__1");
    }
}
