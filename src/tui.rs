use crate::session::{RecordingSession, SessionState};
use crate::types::RecordedState;
use crate::waveform::WaveformStatus;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

/// 描画とイベントポーリングの周期 (ミリ秒)
const TICK_INTERVAL_MS: u64 = 25;

/// 録音セッションのTUIアプリケーション
///
/// 左にレクリストのテーブル、右に波形、下部に操作ガイドとエラーを
/// 表示する。キー操作はすべてセッションの名前付き遷移に対応し、
/// 遷移が拒否された場合はエラーメッセージとして下部に出る。
pub struct TuiApp {
    session: RecordingSession,
    table_state: TableState,
    last_error: Option<String>,
    running: bool,
}

impl TuiApp {
    pub fn new(session: RecordingSession) -> Self {
        Self {
            session,
            table_state: TableState::default(),
            last_error: None,
            running: true,
        }
    }

    /// TUIを起動
    pub fn run(&mut self) -> Result<()> {
        // ターミナルを初期化
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // メインループ
        loop {
            // 録音中のキューをドレインして波形を更新
            if let Err(e) = self.session.tick() {
                self.last_error = Some(e.to_string());
            }

            // 画面を描画
            terminal.draw(|f| self.draw(f))?;

            // イベントをポーリング（25msごと）
            if event::poll(Duration::from_millis(TICK_INTERVAL_MS))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            self.running = false;
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            // Ctrl+C で終了
                            self.running = false;
                        }
                        KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            // Ctrl+Z でプロセスを一時停止
                            // まずターミナルをリストア
                            disable_raw_mode()?;
                            execute!(io::stdout(), LeaveAlternateScreen)?;

                            // プロセスを一時停止
                            #[cfg(unix)]
                            {
                                use nix::sys::signal::{self, Signal};
                                let _ = signal::raise(Signal::SIGTSTP);
                            }

                            // 再開後にターミナルを再初期化
                            enable_raw_mode()?;
                            execute!(io::stdout(), EnterAlternateScreen)?;
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            self.apply(|s| s.previous());
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            self.apply(|s| s.next());
                        }
                        KeyCode::Char(' ') | KeyCode::Char('r') | KeyCode::Enter => {
                            self.apply(|s| s.toggle_recording());
                        }
                        _ => {}
                    }
                }
            }

            if !self.running {
                break;
            }
        }

        // ターミナルをリストア
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        // 録音中でも蓄積分をフラッシュしてからデバイスを解放する
        self.session.close();

        Ok(())
    }

    /// セッション操作を実行し、結果をエラー表示に反映する
    fn apply<F>(&mut self, op: F)
    where
        F: FnOnce(&mut RecordingSession) -> Result<(), crate::error::SessionError>,
    {
        match op(&mut self.session) {
            Ok(()) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    /// 画面を描画
    fn draw(&mut self, f: &mut Frame) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // 選択中の音素とセッション状態
                Constraint::Min(8),    // テーブルと波形
                Constraint::Length(2), // 操作ガイドとエラー
            ])
            .split(f.area());

        self.draw_header(f, sections[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(24)])
            .split(sections[1]);

        self.draw_reclist(f, body[0]);
        self.draw_waveform(f, body[1]);
        self.draw_footer(f, sections[2]);
    }

    /// 選択中の音素とセッション状態を描画
    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let phoneme = self.session.current_phoneme().unwrap_or("N/A");

        let (state_text, state_color) = match self.session.state() {
            SessionState::Recording(_) => ("● 録音中", Color::Red),
            SessionState::Armed(_) => ("待機", Color::Green),
            SessionState::Idle => ("未選択", Color::Gray),
        };

        let line = Line::from(vec![
            Span::styled(
                phoneme,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                state_text,
                Style::default()
                    .fg(state_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);

        let block = Block::default().title("vb-studio").borders(Borders::ALL);
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    /// レクリストのテーブルを描画
    fn draw_reclist(&mut self, f: &mut Frame, area: Rect) {
        let entries = self.session.entries();

        let title = format!(
            "レクリスト ({}/{})",
            self.session.recorded_count(),
            entries.len()
        );
        let block = Block::default().title(title).borders(Borders::ALL);

        if entries.is_empty() {
            let paragraph =
                Paragraph::new("レクリストが読み込まれていません").block(block);
            f.render_widget(paragraph, area);
            return;
        }

        let rows: Vec<Row> = entries
            .iter()
            .map(|entry| {
                let (mark, color) = match entry.state {
                    RecordedState::Absent => ("未", Color::DarkGray),
                    RecordedState::Present => ("済", Color::Green),
                    RecordedState::PresentButIncompatible => ("済!", Color::Yellow),
                };
                Row::new(vec![
                    Cell::from(Span::styled(mark, Style::default().fg(color))),
                    Cell::from(entry.phoneme.as_str()),
                ])
            })
            .collect();

        let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(8)])
            .header(
                Row::new(vec!["録音", "音素"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(block)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("▶ ");

        self.table_state.select(self.session.armed_row());
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    /// 波形を描画
    fn draw_waveform(&self, f: &mut Frame, area: Rect) {
        let presenter = self.session.presenter();

        let (title, title_color) = match presenter.status() {
            WaveformStatus::Idle => ("波形".to_string(), Color::White),
            WaveformStatus::Live => ("波形 - 録音中".to_string(), Color::Cyan),
            WaveformStatus::Loaded(phoneme) => {
                (format!("波形 - 読み込み済み: {}.wav", phoneme), Color::White)
            }
            WaveformStatus::NotFound => ("波形 - ファイルなし".to_string(), Color::Red),
            WaveformStatus::ErrorLoading => {
                ("波形 - 読み込みエラー".to_string(), Color::Red)
            }
        };

        let mut title_spans = vec![Span::styled(title, Style::default().fg(title_color))];
        if presenter.format_mismatch() {
            title_spans.push(Span::styled(
                " [フォーマット不一致]",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let block = Block::default()
            .title(Line::from(title_spans))
            .borders(Borders::ALL);

        // 端末の横解像度まで間引く
        let buckets = area.width.saturating_sub(2).max(1) as usize;
        let points = presenter.chart_points(buckets);

        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points)];

        let [x_min, x_max] = presenter.x_bounds();
        let [y_min, y_max] = presenter.y_bounds();

        let chart = Chart::new(datasets)
            .block(block)
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::DarkGray))
                    .bounds([x_min, x_max]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::DarkGray))
                    .bounds([y_min, y_max])
                    .labels(vec![
                        format!("{:.0}", y_min),
                        "0".to_string(),
                        format!("{:.0}", y_max),
                    ]),
            );

        f.render_widget(chart, area);
    }

    /// 操作ガイドとエラー表示を描画
    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let help = Line::from(vec![
            Span::styled("↑/↓", Style::default().fg(Color::Cyan)),
            Span::raw(": 移動  "),
            Span::styled("Space", Style::default().fg(Color::Cyan)),
            Span::raw(": 録音開始/停止  "),
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::raw(": 終了"),
        ]);
        f.render_widget(Paragraph::new(help), sections[0]);

        if let Some(error) = &self.last_error {
            let line = Line::from(Span::styled(
                error.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
            f.render_widget(Paragraph::new(line), sections[1]);
        }
    }
}
