//! Terminal front end: table renderer and command parser.

use std::io::Write;
use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, CellAlignment, Table};
use tracing::warn;

use clickhist::{
    Axis, BinSummary, CaseRecord, CellRegion, FlatIndex, HistogramCell, JointHistogram,
    MessageLevel, QuantileMarker, Renderer, ResolvedPoint, SampledPoint, SessionLog,
    VariableMetadata,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub const HELP: &str = "\
Commands:
  cell <ix> <iy>     open a histogram cell and show its sampled points
  pick <n>           select the n-th point of the displayed sample
  point <flat>       select a displayed point by flat index
  confirm            record a case for the selected point
  clear              close the open cell
  hist               redraw the histogram
  summary <ix> <iy>  statistics over every point of a cell
  log                list the cases recorded so far
  help               show this text
  quit               end the session";

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Cell { ix: usize, iy: usize },
    Pick(usize),
    Point(FlatIndex),
    Confirm,
    Clear,
    Histogram,
    Summary { ix: usize, iy: usize },
    Log,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?.to_lowercase();
        let args: Vec<&str> = words.collect();

        let numbers = |usage: &'static str, n: usize| -> Result<Vec<usize>, CommandError> {
            if args.len() != n {
                return Err(CommandError::Usage(usage));
            }
            args.iter()
                .map(|a| a.parse::<usize>().map_err(|_| CommandError::Usage(usage)))
                .collect()
        };

        match name.as_str() {
            "cell" | "c" => {
                let n = numbers("cell <ix> <iy>", 2)?;
                Ok(Command::Cell { ix: n[0], iy: n[1] })
            }
            "pick" | "p" => {
                let n = numbers("pick <n>", 1)?;
                if n[0] == 0 {
                    return Err(CommandError::Usage("pick <n> (n starts at 1)"));
                }
                Ok(Command::Pick(n[0]))
            }
            "point" => Ok(Command::Point(numbers("point <flat>", 1)?[0])),
            "summary" | "s" => {
                let n = numbers("summary <ix> <iy>", 2)?;
                Ok(Command::Summary { ix: n[0], iy: n[1] })
            }
            "confirm" => Ok(Command::Confirm),
            "clear" => Ok(Command::Clear),
            "hist" | "histogram" => Ok(Command::Histogram),
            "log" => Ok(Command::Log),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Renders the session as text tables on any writer.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    x: VariableMetadata,
    y: VariableMetadata,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, x: VariableMetadata, y: VariableMetadata) -> Self {
        Self { out, x, y }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write to console");
        }
    }

    pub fn prompt(&mut self) {
        if let Err(e) = write!(self.out, "chad> ").and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write prompt");
        }
    }

    pub fn show_help(&mut self) {
        self.emit(HELP);
    }

    pub fn show_summary(&mut self, summary: &BinSummary) {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            format!("Cell ({}, {})", summary.ix, summary.iy),
            self.x.id.clone(),
            self.y.id.clone(),
        ]);
        table.add_row(vec![
            "min".to_string(),
            self.x.format_value(summary.x_min),
            self.y.format_value(summary.y_min),
        ]);
        table.add_row(vec![
            "mean".to_string(),
            self.x.format_value(summary.x_mean),
            self.y.format_value(summary.y_mean),
        ]);
        table.add_row(vec![
            "max".to_string(),
            self.x.format_value(summary.x_max),
            self.y.format_value(summary.y_max),
        ]);
        for marker in summary.markers.iter().filter(|m| m.axis == Axis::X) {
            let y_value = summary
                .markers
                .iter()
                .find(|m| m.axis == Axis::Y && m.percentile == marker.percentile)
                .map(|m| self.y.format_value(m.value))
                .unwrap_or_default();
            table.add_row(vec![
                format!("p{}", marker.percentile),
                self.x.format_value(marker.value),
                y_value,
            ]);
        }
        let text = format!("{} points\n{}", summary.count, table);
        self.emit(&text);
    }

    /// Non-empty cells with their share of the binned total.
    pub fn show_cell_table(&mut self, histogram: &JointHistogram) {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            "ix".to_string(),
            "iy".to_string(),
            self.x.id.clone(),
            self.y.id.clone(),
            "count".to_string(),
            "%".to_string(),
        ]);
        for cell in histogram.cells().filter(|c| !c.is_empty()) {
            table.add_row(vec![
                cell.ix.to_string(),
                cell.iy.to_string(),
                range_label(cell.x_range),
                range_label(cell.y_range),
                cell.count().to_string(),
                format!(
                    "{:.2}",
                    histogram.percent_of_total(cell.ix, cell.iy).unwrap_or(0.0)
                ),
            ]);
        }
        let text = format!("{} samples binned\n{}", histogram.total_count(), table);
        self.emit(&text);
    }

    pub fn show_log(&mut self, log: &SessionLog) {
        if log.is_empty() {
            self.emit("No cases recorded yet.");
            return;
        }
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            "case", "time", "lat", "lon", "cell", "files",
        ]);
        for record in log.records() {
            let loc = &record.center.location;
            table.add_row(vec![
                record.case_number.to_string(),
                loc.datetime.format(TIME_FORMAT).to_string(),
                loc.lat.to_string(),
                loc.lon.to_string(),
                format!("({}, {})", record.center.cell.0, record.center.cell.1),
                record.artifacts.len().to_string(),
            ]);
        }
        let text = format!("Session {}\n{}", log.session_id(), table);
        self.emit(&text);
    }
}

fn range_label(range: (f64, f64)) -> String {
    format!("{}-{}", range.0, range.1)
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn show_histogram(&mut self, title: &str, regions: &[CellRegion]) {
        let nx = regions.iter().map(|r| r.ix + 1).max().unwrap_or(0);
        let ny = regions.iter().map(|r| r.iy + 1).max().unwrap_or(0);
        let mut counts = vec![vec![0usize; nx]; ny];
        let mut x_labels = vec![String::new(); nx];
        let mut y_labels = vec![String::new(); ny];
        for r in regions {
            counts[r.iy][r.ix] = r.count;
            x_labels[r.ix] = format!("{}: {}", r.ix, range_label(r.x_range));
            y_labels[r.iy] = format!("{}: {}", r.iy, range_label(r.y_range));
        }

        let mut header = vec![format!("{} \\ {}", self.y.id, self.x.id)];
        header.extend(x_labels);

        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(header);
        // highest y bin on top
        for iy in (0..ny).rev() {
            let mut row = vec![y_labels[iy].clone()];
            row.extend(counts[iy].iter().map(|&c| {
                if c == 0 {
                    ".".to_string()
                } else {
                    c.to_string()
                }
            }));
            table.add_row(row);
        }
        for column in table.column_iter_mut().skip(1) {
            column.set_cell_alignment(CellAlignment::Right);
        }

        let text = format!("{}\n{}", title, table);
        self.emit(&text);
    }

    fn show_sample(&mut self, cell: &HistogramCell, points: &[SampledPoint]) {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            "#".to_string(),
            "flat".to_string(),
            self.x.id.clone(),
            self.y.id.clone(),
        ]);
        for (n, p) in points.iter().enumerate() {
            table.add_row(vec![
                (n + 1).to_string(),
                p.index.to_string(),
                self.x.format_value(p.x),
                self.y.format_value(p.y),
            ]);
        }
        let text = format!(
            "Cell ({}, {}): {} {}, {} {} ({} points)\n{}",
            cell.ix,
            cell.iy,
            self.x.id,
            range_label(cell.x_range),
            self.y.id,
            range_label(cell.y_range),
            cell.count(),
            table
        );
        self.emit(&text);
    }

    fn show_overlay(&mut self, markers: &[QuantileMarker]) {
        let mut lines = Vec::with_capacity(2);
        for (axis, meta) in [(Axis::X, &self.x), (Axis::Y, &self.y)] {
            let values: Vec<String> = markers
                .iter()
                .filter(|m| m.axis == axis)
                .map(|m| format!("p{}={}", m.percentile, meta.format_value(m.value)))
                .collect();
            if !values.is_empty() {
                lines.push(format!("{} quantiles: {}", meta.id, values.join(" ")));
            }
        }
        if !lines.is_empty() {
            let text = lines.join("\n");
            self.emit(&text);
        }
    }

    fn show_selection(&mut self, point: &ResolvedPoint) {
        let loc = &point.location;
        let text = format!(
            "Selected flat {}: {} at lat {}, lon {} ({} = {}, {} = {})",
            loc.flat,
            loc.datetime.format(TIME_FORMAT),
            loc.lat,
            loc.lon,
            self.x.id,
            self.x.format_with_units(point.point.x),
            self.y.id,
            self.y.format_with_units(point.point.y)
        );
        self.emit(&text);
    }

    fn show_case(&mut self, record: &CaseRecord) {
        let mut text = format!(
            "Recorded case {}: {}, {} to {}",
            record.case_number,
            record.window.bbox.describe(),
            record.window.time.start.format(TIME_FORMAT),
            record.window.time.end.format(TIME_FORMAT)
        );
        for artifact in &record.artifacts {
            text.push_str(&format!("\n  {}: {}", artifact.tag, artifact.path.display()));
        }
        self.emit(&text);
    }

    fn show_message(&mut self, level: MessageLevel, text: &str) {
        let line = format!("[{}] {}", level.as_str(), text);
        self.emit(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("cell 2 0".parse(), Ok(Command::Cell { ix: 2, iy: 0 }));
        assert_eq!("  PICK 3 ".parse(), Ok(Command::Pick(3)));
        assert_eq!("point 17".parse(), Ok(Command::Point(17)));
        assert_eq!("s 1 1".parse(), Ok(Command::Summary { ix: 1, iy: 1 }));
        assert_eq!("confirm".parse(), Ok(Command::Confirm));
        assert_eq!("q".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "cell 1".parse::<Command>(),
            Err(CommandError::Usage("cell <ix> <iy>"))
        );
        assert!(matches!(
            "cell a b".parse::<Command>(),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!("pick 0".parse::<Command>(), Err(CommandError::Usage(_))));
        assert_eq!(
            "zoom".parse::<Command>(),
            Err(CommandError::Unknown("zoom".to_string()))
        );
    }

    fn renderer() -> ConsoleRenderer<Vec<u8>> {
        let meta = |id: &str| VariableMetadata {
            id: id.to_string(),
            value_name: id.to_lowercase(),
            units: "mm day-1".to_string(),
            precision: 1,
            multiplier: 1.0,
        };
        ConsoleRenderer::new(Vec::new(), meta("MERRA"), meta("TRMM"))
    }

    fn output(r: ConsoleRenderer<Vec<u8>>) -> String {
        String::from_utf8(r.into_writer()).unwrap()
    }

    #[test]
    fn test_histogram_table() {
        let mut r = renderer();
        let regions = vec![
            CellRegion { ix: 0, iy: 0, x_range: (0.0, 1.0), y_range: (0.0, 1.0), count: 7 },
            CellRegion { ix: 0, iy: 1, x_range: (0.0, 1.0), y_range: (1.0, 11.0), count: 0 },
            CellRegion { ix: 1, iy: 0, x_range: (1.0, 11.0), y_range: (0.0, 1.0), count: 0 },
            CellRegion { ix: 1, iy: 1, x_range: (1.0, 11.0), y_range: (1.0, 11.0), count: 42 },
        ];
        r.show_histogram("MERRA vs TRMM", &regions);
        let text = output(r);
        assert!(text.starts_with("MERRA vs TRMM\n"));
        assert!(text.contains("1: 1-11"));
        assert!(text.contains("42"));
        // y bin 1 is printed above y bin 0
        assert!(text.find("42").unwrap() < text.find('7').unwrap());
    }

    #[test]
    fn test_overlay_and_message() {
        let mut r = renderer();
        r.show_overlay(&[
            QuantileMarker { axis: Axis::X, percentile: 5.0, value: 0.26 },
            QuantileMarker { axis: Axis::Y, percentile: 5.0, value: 1.0 },
        ]);
        r.show_message(MessageLevel::Warning, "disk full");
        let text = output(r);
        assert!(text.contains("MERRA quantiles: p5=0.3"));
        assert!(text.contains("TRMM quantiles: p5=1.0"));
        assert!(text.contains("[warning] disk full"));
    }

    #[test]
    fn test_empty_log() {
        let mut r = renderer();
        r.show_log(&SessionLog::new());
        assert_eq!(output(r), "No cases recorded yet.\n");
    }
}
