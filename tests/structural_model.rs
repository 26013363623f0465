// tests/structural_model.rs
//
// 一時ディレクトリに小さな Angular プロジェクトを組み立てて、
// 解析結果の JSON 形状をエンドツーエンドで検証する。

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::Value;

use angular_app_analyzer::project_analyzer::{ProjectAnalyzer, find_routing_file};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn build_project(root: &Path) {
    write(
        root,
        "src/app/app-routing.module.ts",
        r#"
        const routes = [
            { path: 'home', component: HomeComponent },
            { path: 'items', component: ListComponent, children: [
                { path: ':id', component: DetailComponent },
            ]},
            { path: '', redirectTo: 'home' },
        ];
        @NgModule({ imports: [RouterModule.forRoot(routes)] })
        export class AppRoutingModule {}
        "#,
    );
    write(
        root,
        "src/app/home/home.component.ts",
        r#"
        @Component({
            selector: 'app-home',
            template: `
                <form [formGroup]="signupForm">
                    <input formControlName="email" required>
                    <button type="submit" value="save">Save</button>
                </form>
                <input>
                <input>
            `,
        })
        export class HomeComponent {
            ngOnInit() {
                this.signupForm = this.formBuilder.group({
                    email: ['', [Validators.required, Validators.email]],
                });
            }
        }
        "#,
    );
    write(
        root,
        "src/app/list/list.component.ts",
        r#"
        @Component({
            selector: 'app-list',
            templateUrl: './list.component.html',
        })
        export class ListComponent {
            open(item) {
                this.router.navigate(['/items', item.id]);
            }
            reload() {
                this.itemService.fetchAll();
            }
        }
        "#,
    );
    write(
        root,
        "src/app/list/list.component.html",
        r#"
        <div>
            <button (click)="open(item)">Open</button>
            <button (click)="reload()">Reload</button>
            <a routerLink="/home">Home</a>
        </div>
        "#,
    );
}

#[test]
fn structural_model_json_shape() {
    let dir = tempfile::tempdir().unwrap();
    build_project(dir.path());

    let routing = find_routing_file(dir.path()).unwrap();
    let result = ProjectAnalyzer::new().analyze(dir.path(), &routing).unwrap();
    let json: Value = serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();

    // ルートマップ: 宣言順、子ルートは親パスと結合される
    let components = json["routeMap"]["components"].as_array().unwrap();
    let routes: Vec<(&str, &str)> = components
        .iter()
        .map(|c| {
            (
                c["component"].as_str().unwrap(),
                c["route"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        routes,
        vec![
            ("HomeComponent", "home"),
            ("ListComponent", "items"),
            ("DetailComponent", "items/:id"),
        ]
    );
    let redirections = json["routeMap"]["redirections"].as_array().unwrap();
    assert_eq!(redirections.len(), 1);
    assert_eq!(redirections[0]["redirectTo"], "home");

    let component_map = json["componentMap"].as_array().unwrap();
    assert_eq!(component_map.len(), 2);

    // home: ID 生成・バリデーション・submit フラグ
    let home = component_map
        .iter()
        .find(|c| c["info"]["selector"] == "app-home")
        .unwrap();
    let widgets = home["info"]["widgets"].as_array().unwrap();

    let button = widgets.iter().find(|w| w["type"] == "button").unwrap();
    assert_eq!(button["id"], "BUTTON__save__1");
    assert_eq!(button["triggersFormSubmission"], true);

    let email = widgets
        .iter()
        .find(|w| w["attributes"]["formControlName"] == "email")
        .unwrap();
    // 属性由来の required に FormGroup 由来のルールが追記される
    assert_eq!(
        email["validationRules"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect::<Vec<_>>(),
        vec!["required", "required", "email"]
    );

    // 無名 input の連番はテンプレート内で 1 始まり
    let plain_ids: Vec<&str> = widgets
        .iter()
        .filter(|w| w["type"] == "input" && w["attributes"].get("formControlName").is_none())
        .map(|w| w["id"].as_str().unwrap())
        .collect();
    assert_eq!(plain_ids, vec!["INPUT__2", "INPUT__3"]);

    // list: イベント→呼び出し解決
    let list = component_map
        .iter()
        .find(|c| c["info"]["selector"] == "app-list")
        .unwrap();
    let maps = list["widgetEventMaps"].as_array().unwrap();
    assert_eq!(maps.len(), 2);

    let open_map = maps
        .iter()
        .find(|m| m["widgetID"] == "BUTTON__open__1")
        .unwrap();
    let call = &open_map["events"][0]["calls"][0];
    assert_eq!(call["caller"], "this.router.navigate");
    assert_eq!(call["called"], "items/:id");
    assert_eq!(call["data"][0], "item.id");

    let reload_map = maps
        .iter()
        .find(|m| m["widgetID"] == "BUTTON__reload__2")
        .unwrap();
    assert_eq!(reload_map["events"][0]["calls"][0]["called"], "/backend");

    // routerLink 疑似イベントはハンドラ解決の対象外なので
    // アンカーの widgetEventMap は作られない
    assert!(
        maps.iter()
            .all(|m| !m["widgetID"].as_str().unwrap().starts_with("A__"))
    );
}
