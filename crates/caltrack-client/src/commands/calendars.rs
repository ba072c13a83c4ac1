//! `caltrack calendars`: list readable calendars.

use caltrack_providers::{CalendarInfo, CalendarProvider, select_calendars};

use crate::config::ClientConfig;
use crate::error::ClientResult;

pub async fn list(config: &ClientConfig) -> ClientResult<()> {
    let provider = super::authenticated_provider(config)?;
    let calendars = provider.list_calendars().await?;

    let allow_list = &config.fetch.calendars;
    let selected: Vec<String> = select_calendars(calendars.clone(), Some(allow_list.as_slice()))
        .into_iter()
        .map(|c| c.id)
        .collect();

    for line in calendar_lines(&calendars, &selected) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per calendar; `*` marks the calendars a fetch would read.
fn calendar_lines(calendars: &[CalendarInfo], selected_ids: &[String]) -> Vec<String> {
    calendars
        .iter()
        .map(|c| {
            let mark = if selected_ids.contains(&c.id) { '*' } else { ' ' };
            let primary = if c.is_primary { " (primary)" } else { "" };
            format!("{} {}{}  [{}]", mark, c.name, primary, c.id)
        })
        .collect()
}
