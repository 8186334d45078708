//! Report rendering
//!
//! Every command result is printed either as pretty JSON (the serde form of
//! the library's output types) or as a plain-text table.

use crate::config::OutputFormat;
use anyhow::Result;
use engagement_core::analytics::{
    ActivationCheckins, Dashboard, DayCheckins, FilterStats, FunnelStage, HourlyPeaks, Metrics,
    PrizeRedemptions,
};
use engagement_core::relations::{ActivationStats, EventStats, UserProfile};
use engagement_core::Record;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────";

/// Plain-text rendering of a command result
pub trait TextReport {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Print a result in the requested format
pub fn emit<T>(value: &T, format: OutputFormat, out: &mut dyn Write) -> Result<()>
where
    T: Serialize + TextReport + ?Sized,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputFormat::Txt => value.write_txt(out)?,
    }
    out.flush()?;
    Ok(())
}

fn heading(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  {}", title)?;
    writeln!(out, "{}", RULE)
}

fn opt_text(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// `Label: value` line for an attribute of a record, if present
fn attribute_line(out: &mut dyn Write, record: &Record, name: &str) -> io::Result<()> {
    if let Some(value) = record.get(name) {
        match value {
            Value::String(text) => writeln!(out, "  {:<14} {}", name, text)?,
            other => writeln!(out, "  {:<14} {}", name, other)?,
        }
    }
    Ok(())
}

fn record_ids(records: &[&Record]) -> String {
    if records.is_empty() {
        return "-".to_string();
    }
    records
        .iter()
        .map(|r| r.id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl TextReport for Metrics {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Metrics")?;
        writeln!(out, "  Users with check-ins:   {}", self.users_with_checkins)?;
        writeln!(out, "  Check-ins:              {}", self.total_checkins)?;
        writeln!(out, "  Redemptions:            {}", self.total_redemptions)?;
        writeln!(out, "  Published activations:  {}", self.published_activations)?;
        writeln!(out, "  Mean rating:            {:.2}", self.mean_rating)
    }
}

impl TextReport for Vec<ActivationCheckins> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Check-ins by activation")?;
        writeln!(
            out,
            "  {:>6}  {:<28} {:>9} {:>7} {:<12} {:<14} {:>7}",
            "ID", "Name", "Check-ins", "Rating", "Type", "Location", "Points"
        )?;
        writeln!(out, "{}", THIN_RULE)?;
        for row in self {
            writeln!(
                out,
                "  {:>6}  {:<28} {:>9} {:>7.2} {:<12} {:<14} {:>7}",
                row.id,
                row.name,
                row.checkins,
                row.mean_rating,
                opt_text(row.kind.as_deref()),
                opt_text(row.location.as_deref()),
                row.points
            )?;
        }
        Ok(())
    }
}

impl TextReport for Vec<DayCheckins> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Check-ins by day")?;
        writeln!(out, "  {:<12} {:>9} {:>7}", "Day", "Check-ins", "Rating")?;
        writeln!(out, "{}", THIN_RULE)?;
        for row in self {
            writeln!(
                out,
                "  {:<12} {:>9} {:>7.2}",
                row.label, row.checkins, row.mean_rating
            )?;
        }
        Ok(())
    }
}

impl TextReport for HourlyPeaks {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Check-ins by hour")?;
        let peak = self.buckets.iter().map(|b| b.count).max().unwrap_or(0);
        for bucket in &self.buckets {
            let width = if peak == 0 { 0 } else { bucket.count * 30 / peak };
            writeln!(
                out,
                "  {}  {:>5}  {}",
                bucket.label,
                bucket.count,
                "█".repeat(width)
            )?;
        }
        let days: Vec<&str> = self.days.iter().map(|d| d.label.as_str()).collect();
        writeln!(out, "{}", THIN_RULE)?;
        writeln!(out, "  Days with check-ins: {}", days.join(", "))
    }
}

impl TextReport for Vec<PrizeRedemptions> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Redemptions by prize")?;
        writeln!(
            out,
            "  {:>6}  {:<28} {:>11} {:>7} {:>7}",
            "ID", "Prize", "Redemptions", "Points", "Stock"
        )?;
        writeln!(out, "{}", THIN_RULE)?;
        for row in self {
            writeln!(
                out,
                "  {:>6}  {:<28} {:>11} {:>7} {:>7}",
                row.id, row.title, row.redemptions, row.points, row.stock
            )?;
        }
        Ok(())
    }
}

impl TextReport for Vec<FunnelStage> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Funnel")?;
        for stage in self {
            writeln!(
                out,
                "  {:<18} {:>7} {:>4}%  {}",
                stage.stage,
                stage.count,
                stage.percentage,
                "█".repeat(stage.percentage as usize / 4)
            )?;
        }
        Ok(())
    }
}

impl TextReport for FilterStats {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, "Filter coverage")?;
        writeln!(
            out,
            "  {} of {} check-ins ({}%)",
            self.filtered, self.total, self.percentage
        )?;
        writeln!(
            out,
            "  Active filters: {}",
            if self.has_active_filters { "yes" } else { "no" }
        )
    }
}

impl TextReport for Dashboard {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        self.filter_stats.write_txt(out)?;
        writeln!(out)?;
        self.metrics.write_txt(out)?;
        writeln!(out)?;
        self.funnel.write_txt(out)?;
        writeln!(out)?;
        self.top_activations.write_txt(out)?;
        writeln!(out)?;
        self.checkins_by_day.write_txt(out)?;
        writeln!(out)?;
        self.hourly_peaks.write_txt(out)?;
        writeln!(out)?;
        self.redemptions_by_prize.write_txt(out)
    }
}

impl TextReport for UserProfile<'_> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, &format!("User {}", self.user.id))?;
        for name in self.user.attributes.keys() {
            attribute_line(out, self.user, name)?;
        }
        writeln!(out, "{}", THIN_RULE)?;
        writeln!(out, "  Check-ins:      {}", record_ids(&self.checkins))?;
        writeln!(out, "  Redemptions:    {}", self.redemptions.len())?;
        for redemption in &self.redemptions {
            writeln!(
                out,
                "    #{} prizes: {}",
                redemption.redemption.id,
                record_ids(&redemption.prizes)
            )?;
        }
        writeln!(out, "  Lucky numbers:  {}", record_ids(&self.lucky_numbers))?;
        writeln!(out, "  Evaluations:    {}", record_ids(&self.evaluations))?;
        writeln!(
            out,
            "  Coin guess:     {}",
            self.coin_guess.map_or("-".to_string(), |r| r.id.to_string())
        )?;
        writeln!(
            out,
            "  Survey:         {}",
            self.survey.map_or("-".to_string(), |r| r.id.to_string())
        )
    }
}

impl TextReport for ActivationStats<'_> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, &format!("Activation {}", self.activation.id))?;
        for name in self.activation.attributes.keys() {
            attribute_line(out, self.activation, name)?;
        }
        writeln!(out, "{}", THIN_RULE)?;
        writeln!(out, "  Participants:   {}", self.total_users)?;
        writeln!(out, "  Evaluations:    {}", self.total_evaluations)?;
        writeln!(out, "  Mean rating:    {:.1}", self.mean_rating)?;
        writeln!(
            out,
            "  Event:          {}",
            self.event.map_or("-".to_string(), |r| r.id.to_string())
        )
    }
}

impl TextReport for EventStats<'_> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        heading(out, &format!("Event {}", self.event.id))?;
        for name in self.event.attributes.keys() {
            attribute_line(out, self.event, name)?;
        }
        writeln!(out, "{}", THIN_RULE)?;
        writeln!(
            out,
            "  Client:         {}",
            self.client.map_or("-".to_string(), |r| r.id.to_string())
        )?;
        writeln!(out, "  Activations:    {}", record_ids(&self.activations))?;
        writeln!(out, "  Check-ins:      {}", self.total_checkins)?;
        writeln!(out, "  Unique users:   {}", self.unique_users)
    }
}

impl TextReport for Vec<Value> {
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        for value in self {
            match value {
                Value::String(text) => writeln!(out, "{}", text)?,
                other => writeln!(out, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl TextReport for Value {
    /// Documents have no tabular form; text output is the pretty JSON
    fn write_txt(&self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}
