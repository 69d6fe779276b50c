use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

use crate::app::App;
use crate::config::WindowBounds;
use crate::status;
use crate::tab::{PreviewMode, TabId};

const ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NewTab,
    Open,
    Save,
    SaveAs,
    Close,
    Exit,
    Switch,
    NextTab,
    PrevTab,
    Move,
    Insert,
    Backspace,
    Select,
    Find,
    FindNext,
    FindPrev,
    Case,
    Replace,
    ReplaceAll,
    Preview,
    Wrap,
    Theme,
    ThemeReset,
    Zoom,
    ZoomIn,
    ZoomOut,
    Minimize,
    Maximize,
    Resize,
    Tabs,
    Status,
    Key,
    Help,
}

/// Name, aliases, action and help line for every command.
const COMMANDS: &[(&str, &[&str], Action, &str)] = &[
    ("new", &["n"], Action::NewTab, "new                  open an empty tab"),
    ("open", &["o", "e"], Action::Open, "open [path]          open a file"),
    ("save", &["w"], Action::Save, "save                 save the active tab"),
    ("save-as", &["saveas"], Action::SaveAs, "save-as              save under a new name"),
    ("close", &["q"], Action::Close, "close [id]           close a tab"),
    ("exit", &["quit", "qa"], Action::Exit, "exit                 close every tab and quit"),
    ("switch", &["tab", "b"], Action::Switch, "switch <id>          activate a tab"),
    ("next-tab", &["bn"], Action::NextTab, "next-tab             activate the next tab"),
    ("prev-tab", &["bp"], Action::PrevTab, "prev-tab             activate the previous tab"),
    ("move", &["mv"], Action::Move, "move <from> <to>     reorder tabs"),
    ("insert", &["i"], Action::Insert, "insert <text>        type text (\\n, \\t)"),
    ("backspace", &["bs"], Action::Backspace, "backspace            delete backwards"),
    ("select", &["sel"], Action::Select, "select <start> <end> set the selection"),
    ("find", &["search", "/"], Action::Find, "find <query>         search the active tab"),
    ("find-next", &["fn"], Action::FindNext, "find-next            next match"),
    ("find-prev", &["fp"], Action::FindPrev, "find-prev            previous match"),
    ("case", &[], Action::Case, "case on|off          case-sensitive search"),
    ("replace", &["r"], Action::Replace, "replace <text>       replace the current match"),
    ("replace-all", &["ra"], Action::ReplaceAll, "replace-all <text>   replace every match"),
    ("preview", &[], Action::Preview, "preview off|full|split  Markdown preview"),
    ("wrap", &[], Action::Wrap, "wrap [on|off]        word wrap"),
    ("theme", &[], Action::Theme, "theme <--var> <value> set a theme colour"),
    ("theme-reset", &[], Action::ThemeReset, "theme-reset          restore the default theme"),
    ("zoom", &[], Action::Zoom, "zoom <factor>        set the zoom factor"),
    ("zoom-in", &[], Action::ZoomIn, "zoom-in              zoom in one step"),
    ("zoom-out", &[], Action::ZoomOut, "zoom-out             zoom out one step"),
    ("minimize", &["min"], Action::Minimize, "minimize             minimize the window"),
    ("maximize", &["max"], Action::Maximize, "maximize             toggle maximized"),
    ("resize", &[], Action::Resize, "resize <w> <h> [x y] move or resize the window"),
    ("tabs", &["ls", "buffers"], Action::Tabs, "tabs                 list open tabs"),
    ("status", &[], Action::Status, "status               show the status line"),
    ("key", &[], Action::Key, "key <combo>          press a shortcut"),
    ("help", &["h", "?"], Action::Help, "help                 this list"),
];

/// Keyboard shortcuts, normalized to lower case.
const SHORTCUTS: &[(&str, Action)] = &[
    ("ctrl+n", Action::NewTab),
    ("ctrl+o", Action::Open),
    ("ctrl+s", Action::Save),
    ("ctrl+shift+s", Action::SaveAs),
    ("ctrl+w", Action::Close),
    ("ctrl+f", Action::Find),
    ("ctrl+h", Action::Replace),
    ("ctrl+tab", Action::NextTab),
    ("ctrl+shift+tab", Action::PrevTab),
    ("ctrl+=", Action::ZoomIn),
    ("ctrl++", Action::ZoomIn),
    ("ctrl+-", Action::ZoomOut),
];

pub fn shortcut(combo: &str) -> Option<Action> {
    let combo = combo.trim().to_ascii_lowercase().replace(' ', "");
    SHORTCUTS
        .iter()
        .find(|(key, _)| *key == combo)
        .map(|(_, action)| *action)
}

/// Expand `\n`, `\t` and `\\` in typed text.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub struct CommandTable {
    names: HashMap<&'static str, Action>,
}

impl CommandTable {
    pub fn new() -> Self {
        let mut names = HashMap::new();
        for (name, aliases, action, _) in COMMANDS {
            names.insert(*name, *action);
            for alias in aliases.iter() {
                names.insert(*alias, *action);
            }
        }
        Self { names }
    }

    pub fn lookup(&self, name: &str) -> Option<Action> {
        self.names.get(name).copied()
    }

    pub fn help_text(&self) -> String {
        COMMANDS
            .iter()
            .map(|(_, _, _, help)| *help)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_switch(args: &str) -> Result<Option<bool>> {
    match args.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "on" | "true" | "yes" => Ok(Some(true)),
        "off" | "false" | "no" => Ok(Some(false)),
        other => Err(anyhow::anyhow!("on または off を指定してください: {}", other)),
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>, what: &str) -> Result<T> {
    let value = value.ok_or_else(|| anyhow::anyhow!("{} を指定してください", what))?;
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("{} が無効です: {}", what, value))
}

fn parse_index(value: Option<&str>, what: &str) -> Result<usize> {
    parse_number(value, what)
}

/// Resolve a tab by the number shown in the tab list; the active tab when
/// omitted.
fn resolve_tab(app: &App, args: &str) -> Result<TabId> {
    if args.trim().is_empty() {
        return Ok(app.tabs().active_id());
    }
    let raw: u64 = args
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("タブ番号が無効です: {}", args.trim()))?;
    app.tabs()
        .tabs()
        .iter()
        .find(|tab| tab.id.get() == raw)
        .map(|tab| tab.id)
        .ok_or_else(|| anyhow::anyhow!("タブが見つかりません: {}", raw))
}

fn active_name(app: &App) -> String {
    app.tabs()
        .active_tab()
        .map(|tab| tab.name.clone())
        .unwrap_or_default()
}

/// Parses command lines and runs them against the `App`.
pub struct CommandProcessor {
    table: CommandTable,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self {
            table: CommandTable::new(),
        }
    }

    /// Run one command line and describe the result.
    pub async fn execute(&self, line: &str, app: &mut App) -> Result<String> {
        let line = line.trim_start();
        if line.trim().is_empty() {
            return Ok(String::new());
        }

        let (name, args) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest),
            None => (line, ""),
        };

        let mut action = self
            .table
            .lookup(name)
            .ok_or_else(|| anyhow::anyhow!("不明なコマンドです: {}", name))?;
        let mut args = args;

        if action == Action::Key {
            action = shortcut(args)
                .ok_or_else(|| anyhow::anyhow!("割り当てのないキーです: {}", args.trim()))?;
            args = "";
        }

        log::debug!("Executing {:?} with {:?}", action, args);
        self.run(action, args, app).await
    }

    async fn run(&self, action: Action, args: &str, app: &mut App) -> Result<String> {
        match action {
            Action::NewTab => {
                app.new_tab().await;
                Ok(format!("New tab: {}", active_name(app)))
            }
            Action::Open => {
                let path = args.trim();
                let outcome = if path.is_empty() {
                    app.open_file().await
                } else {
                    app.open_path(Path::new(path)).await
                };
                match outcome {
                    Some(_) => Ok(format!("Opened {}", active_name(app))),
                    None => Ok("Nothing opened".to_string()),
                }
            }
            Action::Save => {
                if app.save().await {
                    Ok(format!("Saved {}", active_name(app)))
                } else {
                    Ok("Not saved".to_string())
                }
            }
            Action::SaveAs => {
                if app.save_as().await {
                    Ok(format!("Saved {}", active_name(app)))
                } else {
                    Ok("Not saved".to_string())
                }
            }
            Action::Close => {
                let id = resolve_tab(app, args)?;
                if app.close_tab(id).await {
                    Ok(format!("Closed tab {}", id))
                } else {
                    Ok("Close cancelled".to_string())
                }
            }
            Action::Exit => {
                if app.exit().await {
                    Ok("Goodbye".to_string())
                } else {
                    Ok("Exit cancelled".to_string())
                }
            }
            Action::Switch => {
                if args.trim().is_empty() {
                    return Err(anyhow::anyhow!("タブ番号を指定してください"));
                }
                let id = resolve_tab(app, args)?;
                app.switch_tab(id);
                Ok(format!("Switched to {}", active_name(app)))
            }
            Action::NextTab | Action::PrevTab => {
                app.cycle_tab(action == Action::NextTab);
                Ok(format!("Switched to {}", active_name(app)))
            }
            Action::Move => {
                let mut parts = args.split_whitespace();
                let from = parse_index(parts.next(), "移動元")?;
                let to = parse_index(parts.next(), "移動先")?;
                if app.reorder_tabs(from, to).await {
                    Ok(format!("Moved tab {} to {}", from, to))
                } else {
                    Err(anyhow::anyhow!("タブの位置が無効です: {} -> {}", from, to))
                }
            }
            Action::Insert => {
                app.insert_text(&unescape(args)).await;
                Ok(status::cursor_label(app.tabs()))
            }
            Action::Backspace => {
                app.backspace().await;
                Ok(status::cursor_label(app.tabs()))
            }
            Action::Select => {
                let mut parts = args.split_whitespace();
                let start = parse_index(parts.next(), "開始位置")?;
                let end = parse_index(parts.next(), "終了位置")?;
                app.select(start, end);
                let (start, end) = app.tabs().buffer().selection();
                Ok(format!("Selected {}..{}", start, end))
            }
            Action::Find => {
                if args.is_empty() {
                    if !app.search().is_active() {
                        return Err(anyhow::anyhow!("検索語を指定してください"));
                    }
                    app.find_next();
                } else {
                    app.find(args);
                }
                Ok(app.search().status_label())
            }
            Action::FindNext => {
                app.find_next();
                Ok(app.search().status_label())
            }
            Action::FindPrev => {
                app.find_prev();
                Ok(app.search().status_label())
            }
            Action::Case => {
                let enabled = parse_switch(args)?.unwrap_or(!app.search().is_case_sensitive());
                app.set_case_sensitive(enabled);
                Ok(format!(
                    "Case sensitive: {} ({})",
                    if enabled { "on" } else { "off" },
                    app.search().status_label()
                ))
            }
            Action::Replace => {
                if !app.search().is_active() {
                    return Err(anyhow::anyhow!("先に検索してください"));
                }
                if app.replace_one(&unescape(args)).await {
                    Ok(app.search().status_label())
                } else {
                    Ok("No results".to_string())
                }
            }
            Action::ReplaceAll => {
                if !app.search().is_active() {
                    return Err(anyhow::anyhow!("先に検索してください"));
                }
                let count = app.replace_all(&unescape(args)).await;
                Ok(format!("Replaced {} occurrence(s)", count))
            }
            Action::Preview => {
                let mode = PreviewMode::parse(args)
                    .ok_or_else(|| anyhow::anyhow!("off, full, split のいずれかを指定してください"))?;
                let shown = app.set_preview_mode(mode);
                Ok(format!("Preview: {}", shown.as_str()))
            }
            Action::Wrap => {
                let enabled = app.toggle_word_wrap(parse_switch(args)?).await;
                Ok(format!("Word wrap: {}", if enabled { "on" } else { "off" }))
            }
            Action::Theme => {
                let (name, value) = args
                    .trim()
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow::anyhow!("theme <--変数名> <値> の形式で指定してください"))?;
                app.set_theme_var(name, value).await?;
                Ok(format!("{} = {}", name, value.trim()))
            }
            Action::ThemeReset => {
                app.reset_theme().await;
                Ok("Theme reset".to_string())
            }
            Action::Zoom => {
                let value: f64 = args
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("ズーム値が無効です: {}", args.trim()))?;
                let zoom = app.set_zoom(value).await;
                Ok(format!("Zoom: {:.0}%", zoom * 100.0))
            }
            Action::ZoomIn | Action::ZoomOut => {
                let step = if action == Action::ZoomIn { ZOOM_STEP } else { -ZOOM_STEP };
                let target = app.theme().zoom() + step;
                let zoom = app.set_zoom(target).await;
                Ok(format!("Zoom: {:.0}%", zoom * 100.0))
            }
            Action::Minimize => {
                app.minimize();
                Ok("Minimized".to_string())
            }
            Action::Maximize => {
                app.maximize();
                Ok("Maximized".to_string())
            }
            Action::Resize => {
                let mut parts = args.split_whitespace();
                let width = parse_number(parts.next(), "幅")?;
                let height = parse_number(parts.next(), "高さ")?;
                let (x, y) = match (parts.next(), parts.next()) {
                    (Some(x), Some(y)) => (
                        Some(parse_number(Some(x), "x 座標")?),
                        Some(parse_number(Some(y), "y 座標")?),
                    ),
                    (None, _) => (None, None),
                    (Some(_), None) => return Err(anyhow::anyhow!("y 座標を指定してください")),
                };
                let bounds = WindowBounds { width, height, x, y };
                if !app.set_window_bounds(bounds).await {
                    return Err(anyhow::anyhow!("ウィンドウが小さすぎます: {}x{}", width, height));
                }
                Ok(format!("Window: {}x{}", width, height))
            }
            Action::Tabs => Ok(status::tab_strip(app.tabs()).join("\n")),
            Action::Status => Ok(format!(
                "{}\n{}",
                status::window_title(app.tabs()),
                status::render_line(app.tabs())
            )),
            Action::Key => Err(anyhow::anyhow!("key は入れ子にできません")),
            Action::Help => Ok(self.table.help_text()),
        }
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::close_gate::SaveChoice;
    use crate::test_support::{start_app, MockHost};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_every_command_resolves() {
        let table = CommandTable::new();
        for (name, aliases, action, _) in COMMANDS {
            assert_eq!(table.lookup(name), Some(*action));
            for alias in aliases.iter() {
                assert_eq!(table.lookup(alias), Some(*action), "alias {}", alias);
            }
        }
        assert_eq!(table.lookup("frobnicate"), None);
    }

    #[test]
    fn test_shortcuts() {
        assert_eq!(shortcut("Ctrl+N"), Some(Action::NewTab));
        assert_eq!(shortcut("ctrl+shift+s"), Some(Action::SaveAs));
        assert_eq!(shortcut("ctrl + tab"), Some(Action::NextTab));
        assert_eq!(shortcut("ctrl+shift+tab"), Some(Action::PrevTab));
        assert_eq!(shortcut("ctrl+="), Some(Action::ZoomIn));
        assert_eq!(shortcut("ctrl+-"), Some(Action::ZoomOut));
        assert_eq!(shortcut("alt+x"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
        assert_eq!(unescape(r"keep \q"), "keep \\q");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[tokio::test]
    async fn test_typing_and_searching() {
        let host = MockHost::new();
        let mut app = start_app(&host).await;
        let processor = CommandProcessor::new();

        let out = processor.execute(r"insert one\ntwo one", &mut app).await.unwrap();
        assert_eq!(out, "Ln 2, Col 8");
        assert_eq!(processor.execute("find one", &mut app).await.unwrap(), "2 of 2");
        assert_eq!(processor.execute("find-next", &mut app).await.unwrap(), "1 of 2");
        assert_eq!(
            processor.execute("replace-all 1", &mut app).await.unwrap(),
            "Replaced 2 occurrence(s)"
        );
        assert_eq!(app.tabs().buffer().content(), "1\ntwo 1");
    }

    #[tokio::test]
    async fn test_tab_commands() {
        let host = MockHost::new();
        let mut app = start_app(&host).await;
        let processor = CommandProcessor::new();

        assert_eq!(processor.execute("new", &mut app).await.unwrap(), "New tab: Untitled-2");
        assert_eq!(processor.execute("key ctrl+n", &mut app).await.unwrap(), "New tab: Untitled-3");
        assert_eq!(processor.execute("switch 1", &mut app).await.unwrap(), "Switched to Untitled-1");
        assert_eq!(processor.execute("next-tab", &mut app).await.unwrap(), "Switched to Untitled-2");
        processor.execute("move 0 3", &mut app).await.unwrap();
        assert_eq!(
            processor.execute("tabs", &mut app).await.unwrap(),
            "> 2 Untitled-2\n  3 Untitled-3\n  1 Untitled-1"
        );
        assert!(processor.execute("move 5 0", &mut app).await.is_err());
        assert!(processor.execute("switch 99", &mut app).await.is_err());
        assert_eq!(processor.execute("close 3", &mut app).await.unwrap(), "Closed tab 3");
    }

    #[tokio::test]
    async fn test_close_dirty_tab_asks_host() {
        let host = MockHost::new();
        let mut app = start_app(&host).await;
        let processor = CommandProcessor::new();

        processor.execute("insert text", &mut app).await.unwrap();
        host.queue_choice(SaveChoice::Cancel);
        assert_eq!(processor.execute("close", &mut app).await.unwrap(), "Close cancelled");

        host.queue_choice(SaveChoice::DontSave);
        assert_eq!(processor.execute("exit", &mut app).await.unwrap(), "Goodbye");
        assert!(host.closed.load(Ordering::SeqCst));
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_preferences_commands() {
        let host = MockHost::new();
        let mut app = start_app(&host).await;
        let processor = CommandProcessor::new();

        assert_eq!(
            processor.execute("theme --accent #00ff00", &mut app).await.unwrap(),
            "--accent = #00ff00"
        );
        assert!(processor.execute("theme accent #00ff00", &mut app).await.is_err());
        assert_eq!(processor.execute("wrap", &mut app).await.unwrap(), "Word wrap: on");
        assert_eq!(processor.execute("wrap off", &mut app).await.unwrap(), "Word wrap: off");
        assert_eq!(processor.execute("zoom 1.5", &mut app).await.unwrap(), "Zoom: 150%");
        assert_eq!(processor.execute("key ctrl+-", &mut app).await.unwrap(), "Zoom: 140%");
        assert_eq!(processor.execute("preview split", &mut app).await.unwrap(), "Preview: off");
        assert_eq!(processor.execute("theme-reset", &mut app).await.unwrap(), "Theme reset");
        assert!(host.stored_theme().is_empty());
    }

    #[tokio::test]
    async fn test_resize_command() {
        let host = MockHost::new();
        let mut app = start_app(&host).await;
        let processor = CommandProcessor::new();

        assert_eq!(
            processor.execute("resize 800 600 10 -20", &mut app).await.unwrap(),
            "Window: 800x600"
        );
        let stored = host.config.lock().unwrap().window_bounds;
        assert_eq!((stored.x, stored.y), (Some(10), Some(-20)));

        assert!(processor.execute("resize 100 100", &mut app).await.is_err());
        assert!(processor.execute("resize 800", &mut app).await.is_err());
        assert!(processor.execute("resize 800 600 10", &mut app).await.is_err());
        assert_eq!(app.window_bounds().width, 800);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let host = MockHost::new();
        let mut app = start_app(&host).await;
        let processor = CommandProcessor::new();

        assert_eq!(processor.execute("   ", &mut app).await.unwrap(), "");
        assert!(processor.execute("frobnicate", &mut app).await.is_err());
        assert!(processor.execute("key alt+q", &mut app).await.is_err());
        assert!(processor.execute("replace x", &mut app).await.is_err());
        assert!(processor.execute("wrap maybe", &mut app).await.is_err());
        assert!(processor.execute("zoom big", &mut app).await.is_err());
        assert!(processor.execute("preview sideways", &mut app).await.is_err());
    }
}
