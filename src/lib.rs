// src/lib.rs
//
// Angular プロジェクトの静的解析パイプライン。
// ルーティング宣言・テンプレート・コンポーネントロジックを解析して
// 構造モデル `{routeMap, componentMap}` を構築する。
// 計測コードの生成や注入は下流のツールの責務であり、
// このクレートはメモリ上のモデルを返すところまでを担当する。

pub mod error;
pub mod file_resolver;
pub mod logic_analyzer;
pub mod model;
pub mod project_analyzer;
pub mod route_analyzer;
pub mod template;
pub mod ts;
pub mod widget_analyzer;
pub mod widget_id;

pub use error::{AnalyzerError, Result};
pub use logic_analyzer::{BusinessLogicAnalyzer, CallClassifier, SubstringClassifier};
pub use model::{
    AnalysisResult, ComponentEntry, ComponentInfo, EventBinding, EventContext,
    EventHandlerCallContext, Redirection, RouteComponent, RouteMap, WidgetEventMap, WidgetInfo,
};
pub use project_analyzer::{ProjectAnalyzer, find_routing_file};
pub use route_analyzer::RouteAnalyzer;
pub use template::parse_template;
pub use widget_analyzer::TemplateAnalyzer;
pub use widget_id::WidgetIdGenerator;
