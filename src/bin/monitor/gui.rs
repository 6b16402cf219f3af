use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ghosthunter::{
    location_tracker::{LocationTracker, Movement},
    position::{LocationReport, Position},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};
use std::{
    collections::VecDeque,
    error::Error,
    io,
    sync::mpsc::Receiver,
    time::{Duration, Instant},
};

const TRAIL_LENGTH: usize = 30;
// margin around the plotted points, meters
const MARGIN: f64 = 0.5;

fn meters(p: &Position) -> (f64, f64) {
    (p.x as f64 / 1000.0, p.y as f64 / 1000.0)
}

struct App {
    reports: Receiver<LocationReport>,
    tracker: LocationTracker,
    anchors: Vec<(f64, f64)>,
    tag: Vec<(f64, f64)>,
    trail: VecDeque<(f64, f64)>,
    status: String,
}

impl App {
    fn new(reports: Receiver<LocationReport>) -> App {
        App {
            reports,
            tracker: LocationTracker::default(),
            anchors: vec![],
            tag: vec![],
            trail: VecDeque::new(),
            status: "Waiting for the first report...".to_owned(),
        }
    }

    fn on_tick(&mut self) {
        let latest: Vec<LocationReport> = self.reports.try_iter().collect();
        for report in latest {
            self.anchors = report.anchors.iter().map(|a| meters(&a.position)).collect();
            self.tag = report.position.iter().map(meters).collect();

            let n_anchors = report.anchors.len();
            let qf = report.position.map(|p| p.qf);
            match self.tracker.observe(report) {
                Movement::First(p) | Movement::Moved { to: p, .. } => {
                    self.trail.push_back(meters(&p));
                    if self.trail.len() > TRAIL_LENGTH {
                        self.trail.pop_front();
                    }
                }
                Movement::Jitter { .. } | Movement::NoFix => {}
            }

            self.status = match qf {
                Some(qf) => format!("{} anchors in range, fix quality {}%", n_anchors, qf),
                None => format!("{} anchors in range, no fix", n_anchors),
            };
        }
    }

    fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.anchors.iter().chain(self.tag.iter()).chain(self.trail.iter())
    }

    /// Axis bounds that fit everything on screen.
    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let fold = |get: fn(&(f64, f64)) -> f64| {
            self.points().map(get).fold(None, |acc: Option<[f64; 2]>, v| {
                Some(match acc {
                    Some([lo, hi]) => [lo.min(v), hi.max(v)],
                    None => [v, v],
                })
            })
        };
        let pad = |b: Option<[f64; 2]>| match b {
            Some([lo, hi]) => [lo - MARGIN, hi + MARGIN],
            None => [-1.0, 1.0],
        };
        (pad(fold(|p| p.0)), pad(fold(|p| p.1)))
    }
}

pub fn engage_gui(reports: Receiver<LocationReport>) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let tick_rate = Duration::from_millis(100);
    let app = App::new(reports);
    let res = run_app(&mut terminal, app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    return Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn axis_labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| Span::from(format!("{:.1}", v)))
        .collect()
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    let trail: Vec<(f64, f64)> = app.trail.iter().copied().collect();
    let (x_bounds, y_bounds) = app.bounds();
    let chart = Chart::new(vec![
        Dataset::default()
            .name("Anchors")
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&app.anchors),
        Dataset::default()
            .name("Trail")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&trail),
        Dataset::default()
            .name("Hunter")
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&app.tag),
    ])
    .block(Block::default().title(" Ghost hunter position ").borders(Borders::ALL))
    .x_axis(
        Axis::default()
            .title(Span::styled("x (m)", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds(x_bounds)
            .labels(axis_labels(x_bounds)),
    )
    .y_axis(
        Axis::default()
            .title(Span::styled("y (m)", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds(y_bounds)
            .labels(axis_labels(y_bounds)),
    );

    f.render_widget(chart, chunks[0]);
    f.render_widget(
        Paragraph::new(format!("{}   <q> quits", app.status))
            .block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );
}
