// src/model.rs
use serde::Serialize;
use std::collections::BTreeMap;

/// ルートマップ: パス→コンポーネントの対応表とリダイレクト表
///
/// いずれも宣言順を保持する。重複パスの除去は行わない
/// (後から同じパスが宣言されれば両方とも記録される)。
#[derive(Debug, Default, Clone, Serialize)]
pub struct RouteMap {
    /// `{component, route}` の組。route は正規化済みフルパス
    /// (親パスと `/` で結合、動的セグメントは `:param` 表記)
    pub components: Vec<RouteComponent>,
    /// リダイレクト定義。component 対応とは独立に記録される
    pub redirections: Vec<Redirection>,
}

impl RouteMap {
    /// ベースパスに前方一致するルート定義を宣言順で列挙する。
    /// 親ルートが動的子ルートより先に宣言されているケースがあるため、
    /// 最初の一致だけでなく全候補を返す (呼び出し側で絞り込む)
    pub fn find_by_prefix<'a>(
        &'a self,
        base: &'a str,
    ) -> impl Iterator<Item = &'a RouteComponent> {
        let base = base.trim_start_matches('/');
        self.components.iter().filter(move |c| c.route.starts_with(base))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteComponent {
    /// コンポーネントのクラス名 (例: "HomeComponent")
    pub component: String,
    /// 正規化済みフルパス (例: "items/:id")
    pub route: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirection {
    pub route: String,
    pub redirect_to: String,
}

/// テンプレートから抽出した対話的 UI 要素 1 個分の情報
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInfo {
    /// テンプレート内で一意な ID (明示 id 属性、または生成 ID)
    pub id: String,
    /// 要素タグ名 (例: "button", "input", "mat-select")
    #[serde(rename = "type")]
    pub widget_type: String,
    /// バインドされたイベント名→ハンドラ参照 (宣言順)。
    /// 予約イベント `routerLink` のハンドラ欄には遷移先文字列が入る
    pub events: Vec<EventBinding>,
    /// 静的属性をそのまま保持したもの
    pub attributes: BTreeMap<String, String>,
    /// バリデーションルール識別子の一覧。
    /// テンプレート属性由来のものに加えて、ビジネスロジック解析が
    /// FormGroup 初期化子との照合結果を後から追記する
    pub validation_rules: Vec<String>,
    /// type="submit" のボタンのみ true
    pub triggers_form_submission: bool,
}

impl WidgetInfo {
    /// イベント名でハンドラ参照を引く (宣言順の最初のもの)
    pub fn handler_for(&self, event: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|b| b.event == event)
            .map(|b| b.handler.as_str())
    }
}

/// イベント名とハンドラ参照の組 (宣言順を保つため Vec で持つ)
#[derive(Debug, Clone, Serialize)]
pub struct EventBinding {
    pub event: String,
    pub handler: String,
}

/// コンポーネント 1 個分の構造情報
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    /// コンポーネントの外部タグ名 (@Component の selector)
    pub selector: String,
    /// テンプレートから再帰的に収集したウィジェット一覧
    pub widgets: Vec<WidgetInfo>,
    /// テンプレート内で参照している子コンポーネントのタグ名
    pub nested_components: Vec<String>,
}

/// ウィジェット 1 個に対するイベント→呼び出し解決の結果
#[derive(Debug, Clone, Serialize)]
pub struct WidgetEventMap {
    #[serde(rename = "widgetID")]
    pub widget_id: String,
    pub events: Vec<EventContext>,
}

/// 1 イベント分のハンドラ解決結果。`calls` が空のイベントは記録されない
#[derive(Debug, Clone, Serialize)]
pub struct EventContext {
    pub event: String,
    pub handler: String,
    pub calls: Vec<EventHandlerCallContext>,
}

/// ハンドラ本体の中で発見された呼び出し 1 件分
#[derive(Debug, Clone, Serialize)]
pub struct EventHandlerCallContext {
    /// 呼び出し式のソーステキスト (例: "this.router.navigate")
    pub caller: String,
    /// 解決済みターゲット: "/backend"、ルートマップ上のフルパス、
    /// または未解決なら空文字列
    pub called: String,
    /// 動的セグメントに渡された追加引数の生テキスト
    pub data: Vec<String>,
}

/// コンポーネント単位の解析結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    pub info: ComponentInfo,
    pub widget_event_maps: Vec<WidgetEventMap>,
}

/// プロジェクト全体の最終結果 `{routeMap, componentMap}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub route_map: RouteMap,
    pub component_map: Vec<ComponentEntry>,
}
