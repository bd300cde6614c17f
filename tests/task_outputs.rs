// tests/task_outputs.rs

use std::error::Error;

use assetpipe::engine::TaskOutcome;
use assetpipe::pipeline::CancelToken;
use assetpipe::tasks::{TaskId, TaskRegistry, execute};
use assetpipe_test_utils::builders::{ConfigFileBuilder, Project, TestContext};
use assetpipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn run(tc: &TestContext, id: TaskId) -> Result<TaskOutcome, Box<dyn Error>> {
    let registry = TaskRegistry::builtin(&tc.ctx.config, &tc.ctx.paths)?;
    let task = registry.get(id).ok_or("task not registered")?;
    Ok(execute(task.as_ref(), &tc.ctx, &CancelToken::new()))
}

#[test]
fn tasks_with_no_matching_inputs_write_nothing() -> TestResult {
    init_tracing();
    let project = Project::new();
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    for id in TaskId::DEFAULT {
        assert_eq!(run(&tc, id)?, TaskOutcome::Success, "{id}");
    }

    assert!(!project.exists("dist"), "got {:?}", project.files_under("dist"));
    assert!(tc.notifier.all().is_empty());
    assert_eq!(tc.compressor.calls(), 0);
    Ok(())
}

#[test]
fn styles_output_is_stable_across_runs() -> TestResult {
    let project = Project::new();
    project
        .write("src/assets/scss/site.scss", "@import 'colors';\n.a { color: $brand; display: flex; }\n")
        .write("src/assets/scss/_colors.scss", "$brand: #ff0000;\n");
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    assert_eq!(run(&tc, TaskId::Styles)?, TaskOutcome::Success);
    let first = project.read("dist/css/site.css");
    let first_map = project.read("dist/css/maps/site.css.map");

    assert_eq!(run(&tc, TaskId::Styles)?, TaskOutcome::Success);
    assert_eq!(project.read("dist/css/site.css"), first);
    assert_eq!(project.read("dist/css/maps/site.css.map"), first_map);

    // Partials only exist through imports.
    assert!(!project.exists("dist/css/_colors.css"));
    let css = String::from_utf8(first)?;
    assert!(css.contains("red") || css.contains("#f00"), "got {css}");
    assert_eq!(tc.notifier.successes(), ["Styles task complete", "Styles task complete"]);
    Ok(())
}

#[test]
fn one_broken_stylesheet_does_not_block_the_others() -> TestResult {
    let project = Project::new();
    project
        .write("src/assets/scss/broken.scss", ".a { color: ; \n")
        .write("src/assets/scss/fine.scss", ".b { margin: 0 }\n");
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    assert_eq!(run(&tc, TaskId::Styles)?, TaskOutcome::Success);

    assert!(project.exists("dist/css/fine.css"));
    assert!(!project.exists("dist/css/broken.css"));

    let failures = tc.notifier.failures();
    assert_eq!(failures.len(), 1, "got {failures:?}");
    assert!(failures[0].starts_with("Error: "));
    assert!(failures[0].contains("broken.scss"), "got {failures:?}");
    Ok(())
}

#[test]
fn app_deps_keep_declared_order() -> TestResult {
    let project = Project::new();
    project
        .write("vendor/zeta.js", "var zeta = 1;\n")
        .write("vendor/alpha.js", "var alpha = 2;\n");
    let cfg = ConfigFileBuilder::new()
        .memory_cache()
        .app_deps(&["vendor/zeta.js", "vendor/alpha.js"])
        .build();
    let tc = project.context(cfg);

    assert_eq!(run(&tc, TaskId::AppDeps)?, TaskOutcome::Success);

    for bundle in ["dist/js/app-deps.js", "dist/js/app-deps-min.js"] {
        let text = project.read_string(bundle);
        let zeta = text.find("zeta").ok_or("zeta missing")?;
        let alpha = text.find("alpha").ok_or("alpha missing")?;
        assert!(zeta < alpha, "{bundle}: {text}");
    }
    assert!(project.exists("dist/js/maps/app-deps.js.map"));
    assert_eq!(tc.notifier.successes(), ["App dependences task complete"]);
    Ok(())
}

#[test]
fn templates_are_registered_under_prefixed_file_names() -> TestResult {
    let project = Project::new();
    project
        .write("src/app/app.module.js", "angular.module('app', ['templates']);\n")
        .write(
            "src/app/components/widget/widget.component.js",
            "angular.module('app').controller('WidgetCtrl', function ($scope) { $scope.n = 1; });\n",
        )
        .write("src/app/components/widget/widget.html", "<div class=\"widget\">{{ n }}</div>\n");
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    assert_eq!(run(&tc, TaskId::AppAnnotate)?, TaskOutcome::Success);

    let app = project.read_string("dist/js/app.js");
    assert!(app.contains("\"templates/widget.html\""), "got {app}");
    assert!(app.contains("$templateCache"));

    let module = app.find("angular.module('app', ['templates'])").ok_or("module missing")?;
    let templates = app.find("$templateCache").ok_or("templates missing")?;
    assert!(module < templates, "template script must come after the app sources");

    // Implicit injection became an explicit, minification-safe list.
    assert!(app.contains("[\"$scope\", function"), "got {app}");
    assert!(project.exists("dist/js/app-min.js"));
    Ok(())
}

#[test]
fn unchanged_images_are_not_resubmitted() -> TestResult {
    let project = Project::new();
    project
        .write("src/assets/img/logo.png", vec![7u8; 64])
        .write("src/assets/img/icons/star.jpg", vec![9u8; 32]);
    let tc = project.context(ConfigFileBuilder::new().build());

    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Success);
    assert_eq!(tc.compressor.calls(), 2);
    assert_eq!(project.read("dist/img/logo.png").len(), 32);
    assert_eq!(project.read("dist/img/icons/star.jpg").len(), 16);

    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Success);
    assert_eq!(tc.compressor.calls(), 2);

    project.write("src/assets/img/logo.png", vec![8u8; 64]);
    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Success);
    assert_eq!(tc.compressor.submitted().last().map(String::as_str), Some("src/assets/img/logo.png"));
    assert_eq!(tc.compressor.calls(), 3);

    let successes = tc.notifier.successes();
    assert!(successes.contains(&"Image Task Completed: logo.png".to_string()), "got {successes:?}");
    assert!(successes.contains(&"Image Task Completed: icons/star.jpg".to_string()));
    Ok(())
}

#[test]
fn image_cache_survives_a_restart() -> TestResult {
    let project = Project::new();
    project.write("src/assets/img/logo.png", vec![1u8; 10]);

    let first = project.context(ConfigFileBuilder::new().build());
    assert_eq!(run(&first, TaskId::Images)?, TaskOutcome::Success);
    assert_eq!(first.compressor.calls(), 1);
    assert!(project.exists(".assetpipe/images"));

    let second = project.context(ConfigFileBuilder::new().build());
    assert_eq!(run(&second, TaskId::Images)?, TaskOutcome::Success);
    assert_eq!(second.compressor.calls(), 0);
    Ok(())
}

#[test]
fn corrupt_image_cache_fails_before_any_submission() -> TestResult {
    let project = Project::new();
    project.write("src/assets/img/logo.png", vec![5u8; 12]);
    let tc = project.context(ConfigFileBuilder::new().build());
    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Success);
    assert_eq!(tc.compressor.calls(), 1);

    let mut cache = project.read(".assetpipe/images");
    cache.push(0xff);
    project.write(".assetpipe/images", cache);

    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Failed);
    assert_eq!(tc.compressor.calls(), 1);
    let failures = tc.notifier.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("image cache"), "got {failures:?}");

    let restarted = project.context(ConfigFileBuilder::new().build());
    assert_eq!(run(&restarted, TaskId::Images)?, TaskOutcome::Failed);
    assert_eq!(restarted.compressor.calls(), 0);
    Ok(())
}

#[test]
fn rejected_image_fails_the_task_and_is_retried_next_time() -> TestResult {
    let project = Project::new();
    project.write("src/assets/img/bad.png", vec![3u8; 10]);
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());
    tc.compressor.fail_on("src/assets/img/bad.png");

    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Failed);
    assert!(!project.exists("dist/img/bad.png"));
    let failures = tc.notifier.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("bad.png"), "got {failures:?}");

    assert_eq!(run(&tc, TaskId::Images)?, TaskOutcome::Failed);
    assert_eq!(tc.compressor.calls(), 2);
    Ok(())
}

#[test]
fn copy_task_copies_libraries_and_fonts_verbatim() -> TestResult {
    let project = Project::new();
    project
        .write("src/assets/js/lib/d3/d3.min.js", "!function(){}();")
        .write("src/assets/fonts/icons.woff", vec![0u8, 1, 2, 3]);
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    assert_eq!(run(&tc, TaskId::CopyTask)?, TaskOutcome::Success);
    assert_eq!(project.read_string("dist/js/lib/d3/d3.min.js"), "!function(){}();");
    assert_eq!(project.read("dist/fonts/icons.woff"), [0u8, 1, 2, 3]);
    assert!(tc.notifier.all().is_empty());
    Ok(())
}

#[test]
fn sprite_collects_every_icon() -> TestResult {
    let project = Project::new();
    project
        .write("src/assets/svg/home.svg", "<svg viewBox=\"0 0 10 10\"><path d=\"M0 0h10\"/></svg>")
        .write("src/assets/svg/user.svg", "<svg viewBox=\"0 0 20 20\"><circle r=\"5\"/></svg>");
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    assert_eq!(run(&tc, TaskId::Sprite)?, TaskOutcome::Success);
    let sprite = project.read_string("dist/svg/spritemap.svg");
    assert!(sprite.contains("id=\"home\""), "got {sprite}");
    assert!(sprite.contains("id=\"user\""));
    assert_eq!(tc.notifier.successes(), ["SVG task complete"]);
    Ok(())
}

#[test]
fn html_tasks_minify_templates_and_rewrite_views() -> TestResult {
    let project = Project::new();
    project
        .write("src/app/components/nav/nav.html", "<nav>\n    <a  href=\"#\">Home</a>\n</nav>\n")
        .write("src/views/index.html", "<body ng-app=\"app\"><div ng-view></div></body>\n");
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());

    assert_eq!(run(&tc, TaskId::AppHtmlMinify)?, TaskOutcome::Success);
    let nav = project.read_string("dist/js/templates/nav.html");
    assert!(!nav.contains("\n    "), "got {nav:?}");

    assert_eq!(run(&tc, TaskId::AppHtmlify)?, TaskOutcome::Success);
    let index = project.read_string("dist/index.html");
    assert!(index.contains("data-ng-app=\"app\""), "got {index}");
    assert!(index.contains("data-ng-view"));

    assert_eq!(
        tc.notifier.successes(),
        ["App templates task complete", "App templates task complete"]
    );
    Ok(())
}

#[test]
fn cancelled_token_stops_before_writing() -> TestResult {
    let project = Project::new();
    project.write("src/assets/scss/site.scss", ".a { color: red }\n");
    let tc = project.context(ConfigFileBuilder::new().memory_cache().build());
    let registry = TaskRegistry::builtin(&tc.ctx.config, &tc.ctx.paths)?;
    let task = registry.get(TaskId::Styles).ok_or("task not registered")?;

    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(execute(task.as_ref(), &tc.ctx, &cancel), TaskOutcome::Cancelled);
    assert!(!project.exists("dist/css/site.css"));
    assert!(tc.notifier.all().is_empty());
    Ok(())
}
