//! Reports for each API response.

use pitwall_core::{
  model::{Driver, Session},
  summary::{DriverSummary, LeaderboardEntry, RaceSummary, SeasonLeaderboard},
};

use crate::view::Report;

fn seconds(s: f64) -> String {
  if s > 0.0 { format!("{s:.3}") } else { "-".into() }
}

fn speed(kmh: f64) -> String {
  if kmh > 0.0 { format!("{kmh:.1}") } else { "-".into() }
}

pub fn drivers(drivers: &[Driver]) -> Report {
  let mut r = Report::new();
  r.table(
    ["#", "Driver", "Code", "Team", "Country"],
    drivers.iter().map(|d| {
      [
        d.driver_number.to_string(),
        d.full_name(),
        d.name_acronym.clone(),
        d.team_name.clone(),
        d.country_code.clone(),
      ]
    }),
  );
  r
}

pub fn races(races: &[Session]) -> Report {
  let mut r = Report::new();
  r.table(
    ["Key", "Date", "Race", "Circuit"],
    races.iter().map(|s| {
      [
        s.session_key.to_string(),
        s.date_start.format("%Y-%m-%d").to_string(),
        s.country_name.clone(),
        s.circuit_short_name.clone(),
      ]
    }),
  );
  r
}

pub fn driver_summary(s: &DriverSummary) -> Report {
  let d = &s.driver;
  let mut r = Report::new();
  r.line(format!("#{} {} ({}, {})", d.driver_number, d.full_name(), d.team_name, d.country_code))
    .line(format!(
      "Wins: {}  Podiums: {}  Top speed: {} km/h",
      s.performance.wins,
      s.performance.top3,
      speed(s.performance.max_speed),
    ))
    .blank();
  r.table(
    ["Key", "Race", "Circuit", "Pos", "Best lap", "Fastest", "Top speed"],
    s.race_results.iter().map(|res| {
      [
        res.session_key.to_string(),
        res.race.clone(),
        res.circuit_short_name.clone(),
        res.position.to_string(),
        seconds(res.best_lap_duration),
        (if res.fastest_lap { "yes" } else { "" }).to_string(),
        speed(res.max_speed),
      ]
    }),
  );
  r
}

pub fn race_summary(s: &RaceSummary) -> Report {
  let mut r = Report::new();
  r.line(format!(
    "{} ({}), {} [session {}]",
    s.country_name,
    s.circuit_short_name,
    s.date_start.format("%Y-%m-%d"),
    s.session_key,
  ))
  .blank();
  r.table(
    ["Pos", "#", "Driver", "Team", "Country"],
    s.podium.iter().chain(&s.last_place).map(|p| {
      [
        p.position.to_string(),
        p.driver_number.to_string(),
        p.driver.clone(),
        p.team.clone(),
        p.country.clone(),
      ]
    }),
  );
  r.blank();

  match &s.fastest_lap {
    Some(f) => r.line(format!(
      "Fastest lap: {} (#{}) lap {} in {} [{} / {} / {}]",
      f.driver,
      f.driver_number,
      f.lap_number,
      seconds(f.total_time),
      seconds(f.sector_1),
      seconds(f.sector_2),
      seconds(f.sector_3),
    )),
    None => r.line("Fastest lap: -"),
  };
  match &s.top_speed {
    Some(t) => r.line(format!(
      "Top speed: {} (#{}) {} km/h",
      t.driver,
      t.driver_number,
      speed(t.speed_kmh)
    )),
    None => r.line("Top speed: -"),
  };
  r
}

fn leaderboard(r: &mut Report, title: &str, entries: &[LeaderboardEntry]) {
  r.blank().line(title.to_owned());
  r.table(
    ["Rank", "#", "Driver", "Team", "Country", "Count"],
    entries.iter().map(|e| {
      [
        e.rank.to_string(),
        e.driver_number.to_string(),
        e.driver.clone(),
        e.team.clone(),
        e.country.clone(),
        e.count.to_string(),
      ]
    }),
  );
}

pub fn season(s: &SeasonLeaderboard) -> Report {
  let mut r = Report::new();
  r.line(format!("Season {}", s.season));
  leaderboard(&mut r, "Most wins", &s.top_winners);
  leaderboard(&mut r, "Most fastest laps", &s.top_fastest_laps);
  leaderboard(&mut r, "Most podiums", &s.top_podium_finishers);
  r
}
