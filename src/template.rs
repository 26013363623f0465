// src/template.rs
//
// Angular テンプレート (HTML) の簡易パーサ。
// 要素・テキスト・属性 (静的属性 / [property] / (event) / #ref / *structural)
// をノードツリーとして構築する。属性値にはテンプレートソース上の
// バイトオフセット範囲を記録し、ハンドラ式のテキストを後段で
// ソースからそのまま切り出せるようにする。

use crate::error::{AnalyzerError, Result};

/// テンプレートツリーのノード
#[derive(Debug, Clone)]
pub enum TemplateNode {
    Element(ElementNode),
    Text(TextNode),
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    /// タグ名 (小文字化せず宣言どおり保持)
    pub name: String,
    pub attributes: Vec<TemplateAttribute>,
    pub children: Vec<TemplateNode>,
    /// 開始タグ `<` のバイトオフセット
    pub start: usize,
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub value: String,
    pub start: usize,
}

/// 属性の種別。デリミタ (`[]`, `()`, `#`, `*`) は name から除去済み
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// 通常の静的属性 `name="value"`
    Static,
    /// プロパティバインディング `[name]="expr"` (バナナ記法 `[(name)]` も含む)
    Property,
    /// イベントバインディング `(name)="expr"`
    Output,
    /// テンプレート参照 `#name`
    Reference,
    /// 構造ディレクティブ `*name="expr"`
    Structural,
}

#[derive(Debug, Clone)]
pub struct TemplateAttribute {
    pub name: String,
    pub kind: AttrKind,
    /// 属性値 (クォートの中身)。値なし属性 (例: `required`) は None
    pub value: Option<String>,
    /// 属性値のソース上のバイト範囲 (クォートの内側)
    pub value_span: Option<(usize, usize)>,
}

impl ElementNode {
    /// 指定種別・指定名の属性を探す
    pub fn attr(&self, kind: AttrKind, name: &str) -> Option<&TemplateAttribute> {
        self.attributes
            .iter()
            .find(|a| a.kind == kind && a.name == name)
    }

    /// 静的属性の値を引く (値なし属性は空文字列扱い)
    pub fn static_attr(&self, name: &str) -> Option<&str> {
        self.attr(AttrKind::Static, name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    /// 直下の最初の非空テキスト子ノード
    pub fn first_text_child(&self) -> Option<&str> {
        self.children.iter().find_map(|n| match n {
            TemplateNode::Text(t) if !t.value.trim().is_empty() => Some(t.value.as_str()),
            _ => None,
        })
    }
}

/// 閉じタグを持たない HTML の void 要素
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// テンプレートソースをノードツリーにパースする
pub fn parse_template(source: &str) -> Result<Vec<TemplateNode>> {
    let mut parser = TemplateParser {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
    };
    parser.parse_nodes()
}

struct TemplateParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TemplateParser<'a> {
    fn error(&self, message: impl Into<String>) -> AnalyzerError {
        AnalyzerError::TemplateSyntax {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// 兄弟ノード列をパースする。閉じタグの直前で停止する
    fn parse_nodes(&mut self) -> Result<Vec<TemplateNode>> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.bytes.len() || self.starts_with("</") {
                return Ok(nodes);
            }
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.peek() == Some(b'<') {
                nodes.push(TemplateNode::Element(self.parse_element()?));
            } else {
                let start = self.pos;
                while self.pos < self.bytes.len() && self.peek() != Some(b'<') {
                    self.pos += 1;
                }
                let value = &self.src[start..self.pos];
                if !value.is_empty() {
                    nodes.push(TemplateNode::Text(TextNode {
                        value: value.to_string(),
                        start,
                    }));
                }
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        match self.src[self.pos..].find("-->") {
            Some(rel) => {
                self.pos += rel + 3;
                Ok(())
            }
            None => Err(self.error("コメントが閉じられていません")),
        }
    }

    fn parse_element(&mut self) -> Result<ElementNode> {
        let start = self.pos;
        self.pos += 1; // '<'
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error("タグ名がありません"));
        }

        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error(format!("<{name}> が閉じられていません"))),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.starts_with("/>") => {
                    self.pos += 2;
                    // 自己終了タグは子を持たない
                    return Ok(ElementNode {
                        name,
                        attributes,
                        children: Vec::new(),
                        start,
                    });
                }
                _ => attributes.push(self.parse_attribute()?),
            }
        }

        if VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            return Ok(ElementNode {
                name,
                attributes,
                children: Vec::new(),
                start,
            });
        }

        let children = self.parse_nodes()?;

        // 閉じタグの消費。タグ名の不一致は構文エラー扱い
        if self.starts_with("</") {
            self.pos += 2;
            let close_name = self.read_name();
            if close_name != name {
                return Err(self.error(format!(
                    "閉じタグの不一致: <{name}> に対して </{close_name}>"
                )));
            }
            self.skip_whitespace();
            if self.peek() != Some(b'>') {
                return Err(self.error(format!("</{close_name} の後に > がありません")));
            }
            self.pos += 1;
        }
        // 閉じタグのないまま EOF に達した要素はそこで閉じたものとみなす

        Ok(ElementNode {
            name,
            attributes,
            children,
            start,
        })
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.pos += 1;
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> Result<TemplateAttribute> {
        let raw_start = self.pos;
        // 属性名はデリミタごと `=` / 空白 / `>` の手前まで読む
        while matches!(self.peek(), Some(b) if !b.is_ascii_whitespace() && b != b'=' && b != b'>')
        {
            if self.starts_with("/>") {
                break;
            }
            self.pos += 1;
        }
        let raw_name = &self.src[raw_start..self.pos];
        if raw_name.is_empty() {
            return Err(self.error("属性名がありません"));
        }
        let (name, kind) = classify_attr_name(raw_name);

        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            // 値なし属性 (required など)
            return Ok(TemplateAttribute {
                name,
                kind,
                value: None,
                value_span: None,
            });
        }
        self.pos += 1; // '='
        self.skip_whitespace();

        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error(format!("属性 {name} の値がクォートされていません"))),
        };
        self.pos += 1;
        let value_start = self.pos;
        while self.pos < self.bytes.len() && self.peek() != Some(quote) {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(self.error(format!("属性 {name} の値が閉じられていません")));
        }
        let value_end = self.pos;
        self.pos += 1; // 終端クォート

        Ok(TemplateAttribute {
            name,
            kind,
            value: Some(self.src[value_start..value_end].to_string()),
            value_span: Some((value_start, value_end)),
        })
    }
}

/// 属性名のデリミタから種別を判定し、デリミタを除いた名前を返す
fn classify_attr_name(raw: &str) -> (String, AttrKind) {
    if let Some(inner) = raw.strip_prefix("[(").and_then(|s| s.strip_suffix(")]")) {
        (inner.to_string(), AttrKind::Property)
    } else if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        (inner.to_string(), AttrKind::Property)
    } else if let Some(inner) = raw.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        (inner.to_string(), AttrKind::Output)
    } else if let Some(inner) = raw.strip_prefix('#') {
        (inner.to_string(), AttrKind::Reference)
    } else if let Some(inner) = raw.strip_prefix('*') {
        (inner.to_string(), AttrKind::Structural)
    } else {
        (raw.to_string(), AttrKind::Static)
    }
}
