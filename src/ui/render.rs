//! Plain-text rendering of the three screens.
//!
//! Every server-provided string passes through [`sanitize`] before it is
//! printed. Rendering is pure so it can be tested without a terminal.

use std::fmt::Write;

use crate::app::{App, Screen};
use crate::job::{FeedState, JobPosting};
use crate::util::{or_not_specified, sanitize, truncate_to_width};
use crate::views::{BookmarksView, DetailsView, JobsView};

/// Column budget for card headings.
const LINE_WIDTH: usize = 80;

pub(super) const HELP_TEXT: &str = "\
Commands:
  jobs          show the job feed
  bookmarks     show saved jobs
  next          load the next page
  refresh       reload the feed from page 1
  retry         retry the failed page
  open N        show details for item N
  toggle N      bookmark or unbookmark item N (toggle on details)
  remove N      remove bookmark N
  back          return to the list
  help          show this help
  quit          exit";

/// Render the current screen.
pub fn render(app: &App) -> String {
    match app.screen {
        Screen::Jobs => render_jobs(&app.jobs),
        Screen::Bookmarks => render_bookmarks(&app.bookmarks),
        Screen::Details => match &app.details {
            Some(details) => render_details(details),
            None => "No job selected\n".to_string(),
        },
    }
}

/// `tel:` link for a phone number, spaces removed.
pub fn phone_link(phone: &str) -> String {
    let number: String = sanitize(phone)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("tel:{number}")
}

fn marker(bookmarked: bool, pending: bool) -> &'static str {
    match (bookmarked, pending) {
        (_, true) => "~",
        (true, false) => "*",
        (false, false) => " ",
    }
}

/// Two-line card: numbered heading, then place and salary.
fn job_card(number: usize, posting: &JobPosting, mark: &str) -> String {
    let heading = format!(
        "{:>3}. [{}] {} @ {}",
        number,
        mark,
        sanitize(&posting.title),
        sanitize(&posting.company)
    );
    format!(
        "{}\n       Place: {}  Salary: {}\n",
        truncate_to_width(&heading, LINE_WIDTH),
        or_not_specified(posting.details.place.as_deref()),
        or_not_specified(posting.details.salary.as_deref()),
    )
}

pub fn render_jobs(view: &JobsView) -> String {
    let feed = view.feed();
    let mut out = String::new();
    let _ = writeln!(out, "== Jobs (page {}) ==", feed.page());
    if feed.is_refreshing() {
        out.push_str("Refreshing...\n");
    }

    if feed.items().is_empty() {
        match feed.state() {
            FeedState::Loading => out.push_str("Loading jobs...\n"),
            FeedState::Error(_) => {}
            _ => out.push_str("No jobs found\n"),
        }
    }

    for (i, posting) in feed.items().iter().enumerate() {
        let mark = marker(view.is_bookmarked(posting), view.is_pending(posting));
        out.push_str(&job_card(i + 1, posting, mark));
    }

    match feed.state() {
        FeedState::Loading if !feed.items().is_empty() => out.push_str("Loading more...\n"),
        FeedState::Error(msg) => {
            let _ = writeln!(out, "Error: {}  (type 'retry')", sanitize(msg));
        }
        _ => {}
    }
    out
}

pub fn render_bookmarks(view: &BookmarksView) -> String {
    let mut out = String::from("== Bookmarks ==\n");
    if view.is_refreshing() {
        out.push_str("Refreshing...\n");
    }
    if view.items().is_empty() && !view.is_refreshing() {
        out.push_str("No bookmarked jobs\n");
    }
    for (i, posting) in view.items().iter().enumerate() {
        out.push_str(&job_card(i + 1, posting, marker(true, view.is_pending(posting))));
    }
    out
}

pub fn render_details(view: &DetailsView) -> String {
    let posting = view.posting();
    let details = &posting.details;
    let mut out = String::new();

    let _ = writeln!(out, "== {} ==", sanitize(&posting.title));
    let _ = writeln!(out, "Company:       {}", sanitize(&posting.company));
    let _ = writeln!(out, "Place:         {}", or_not_specified(details.place.as_deref()));
    let _ = writeln!(out, "Salary:        {}", or_not_specified(details.salary.as_deref()));
    let _ = writeln!(
        out,
        "Experience:    {}",
        or_not_specified(details.experience.as_deref())
    );
    let _ = writeln!(
        out,
        "Qualification: {}",
        or_not_specified(details.qualification.as_deref())
    );
    match details.phone.as_deref().filter(|p| !p.is_empty()) {
        Some(phone) => {
            let _ = writeln!(out, "Phone:         {} ({})", sanitize(phone), phone_link(phone));
        }
        None => {
            let _ = writeln!(out, "Phone:         {}", or_not_specified(None));
        }
    }

    let state = match (view.is_pending(), view.is_bookmarked()) {
        (true, _) => "saving...",
        (false, true) => "bookmarked",
        (false, false) => "not bookmarked",
    };
    let _ = writeln!(out, "[{state}]  (type 'toggle' or 'back')");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobDetails;
    use crate::storage::BookmarkSet;
    use pretty_assertions::assert_eq;

    fn cook() -> JobPosting {
        JobPosting {
            details: JobDetails {
                place: Some("Chennai".into()),
                salary: Some("₹15000".into()),
                phone: Some("+91 98765 43210".into()),
                ..JobDetails::default()
            },
            ..JobPosting::new("Cook", "ABC")
        }
    }

    #[test]
    fn test_job_card() {
        assert_eq!(
            job_card(1, &cook(), "*"),
            "  1. [*] Cook @ ABC\n       Place: Chennai  Salary: ₹15000\n"
        );
    }

    #[test]
    fn test_card_missing_details() {
        let card = job_card(2, &JobPosting::new("Driver", "XYZ"), " ");
        assert!(card.contains("Place: Not specified  Salary: Not specified"));
    }

    #[test]
    fn test_card_strips_escapes() {
        let card = job_card(1, &JobPosting::new("\x1b[2JCook", "ABC"), " ");
        assert!(!card.contains('\x1b'));
        assert!(card.contains("Cook @ ABC"));
    }

    #[test]
    fn test_phone_link() {
        assert_eq!(phone_link("+91 98765 43210"), "tel:+919876543210");
    }

    #[test]
    fn test_details_screen() {
        let mut view = DetailsView::new(cook());
        view.on_enter(&BookmarkSet::new().with(&cook()));
        let text = render_details(&view);

        assert!(text.contains("Company:       ABC"));
        assert!(text.contains("Experience:    Not specified"));
        assert!(text.contains("Phone:         +91 98765 43210 (tel:+919876543210)"));
        assert!(text.contains("[bookmarked]"));
    }

    #[test]
    fn test_details_without_phone() {
        let view = DetailsView::new(JobPosting::new("Driver", "XYZ"));
        let text = render_details(&view);
        assert!(text.contains("Phone:         Not specified"));
        assert!(text.contains("[not bookmarked]"));
    }

    #[test]
    fn test_details_empty_phone_not_specified() {
        let mut posting = JobPosting::new("Driver", "XYZ");
        posting.details.phone = Some(String::new());
        let text = render_details(&DetailsView::new(posting));
        assert!(text.contains("Phone:         Not specified"));
        assert!(!text.contains("tel:"));
    }

    #[test]
    fn test_jobs_error_keeps_items() {
        let mut view = JobsView::default();
        let first = view.feed_mut().fetch_page();
        view.feed_mut().apply(first, Ok(vec![cook()]));
        let second = view.feed_mut().next_page().unwrap();
        view.feed_mut()
            .apply(second, Err(crate::job::FetchError::HttpStatus(500)));

        let text = render_jobs(&view);
        assert!(text.contains("Cook @ ABC"));
        assert!(text.contains("Error: HTTP error: status 500"));
    }

    #[test]
    fn test_empty_bookmarks() {
        let view = BookmarksView::new();
        assert_eq!(render_bookmarks(&view), "== Bookmarks ==\nNo bookmarked jobs\n");
    }
}
