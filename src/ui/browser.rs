use tracing::warn;

use crate::{
    client::{ClientError, LeadApi},
    dto::lead::LeadResponse,
};

/// Label shown for a lead without a company
pub const UNNAMED_LEAD: &str = "Unnamed Lead";

/// What the lead list area shows
#[derive(Debug, PartialEq, Eq)]
pub enum ViewState<'a> {
    Loading,
    /// No leads exist at all
    Empty,
    /// Leads exist but the filter excludes all of them
    NoMatches,
    Rows(Vec<&'a LeadResponse>),
}

/// Photo pane of the selected lead
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoState {
    Loading,
    Loaded(Vec<String>),
}

/// Ticket for one photo fetch; its answer only lands while the same
/// selection is still open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoRequest {
    pub lead_id: i32,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection {
    lead_id: i32,
    generation: u64,
    photos: PhotoState,
}

/// State of the lead browser.
///
/// Leads are fetched once per activation and kept until the next one.
#[derive(Debug, Default)]
pub struct LeadBrowser {
    leads: Vec<LeadResponse>,
    loading: bool,
    query: String,
    selection: Option<Selection>,
    generation: u64,
}

impl LeadBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached list and enters the loading state
    pub fn begin_activation(&mut self) {
        self.loading = true;
        self.leads.clear();
        self.selection = None;
    }

    /// Takes the list fetched for this activation; failures leave it empty
    pub fn finish_activation(&mut self, outcome: Result<Vec<LeadResponse>, ClientError>) {
        self.loading = false;
        self.leads = outcome.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch leads");
            Vec::new()
        });
    }

    /// Loads the lead list for a fresh activation
    pub async fn activate(&mut self, api: &dyn LeadApi) {
        self.begin_activation();
        let outcome = api.list_leads().await;
        self.finish_activation(outcome);
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn leads(&self) -> &[LeadResponse] {
        &self.leads
    }

    /// Leads matching the current query, in list order
    pub fn filtered(&self) -> Vec<&LeadResponse> {
        let needle = self.query.to_lowercase();
        self.leads
            .iter()
            .filter(|lead| matches_query(lead, &needle))
            .collect()
    }

    pub fn view_state(&self) -> ViewState<'_> {
        if self.loading {
            return ViewState::Loading;
        }
        if self.leads.is_empty() {
            return ViewState::Empty;
        }
        let rows = self.filtered();
        if rows.is_empty() {
            ViewState::NoMatches
        } else {
            ViewState::Rows(rows)
        }
    }

    /// Footer line under the table
    pub fn summary(&self) -> String {
        format!(
            "Showing {} of {} leads",
            self.filtered().len(),
            self.leads.len()
        )
    }

    /// Opens the detail of `lead_id`, clearing any previous photos
    pub fn select(&mut self, lead_id: i32) -> PhotoRequest {
        self.generation += 1;
        self.selection = Some(Selection {
            lead_id,
            generation: self.generation,
            photos: PhotoState::Loading,
        });
        PhotoRequest {
            lead_id,
            generation: self.generation,
        }
    }

    /// Applies a photo fetch result; stale answers are dropped.
    ///
    /// Returns whether the result was applied.
    pub fn receive_photos(
        &mut self,
        request: PhotoRequest,
        outcome: Result<Vec<String>, ClientError>,
    ) -> bool {
        let Some(selection) = self
            .selection
            .as_mut()
            .filter(|s| s.generation == request.generation)
        else {
            return false;
        };

        let urls = outcome.unwrap_or_else(|e| {
            warn!(lead_id = request.lead_id, error = %e, "Failed to fetch photos");
            Vec::new()
        });
        selection.photos = PhotoState::Loaded(urls);
        true
    }

    /// Selects a lead and loads its photos
    pub async fn open(&mut self, api: &dyn LeadApi, lead_id: i32) {
        let request = self.select(lead_id);
        let outcome = api.photo_urls(lead_id).await;
        self.receive_photos(request, outcome);
    }

    pub fn close(&mut self) {
        self.selection = None;
    }

    pub fn selected(&self) -> Option<&LeadResponse> {
        let id = self.selection.as_ref()?.lead_id;
        self.leads.iter().find(|lead| lead.id == id)
    }

    pub fn photos(&self) -> Option<&PhotoState> {
        self.selection.as_ref().map(|s| &s.photos)
    }
}

fn matches_query(lead: &LeadResponse, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [&lead.company, &lead.contact_person, &lead.email]
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(needle))
}

/// Row title for a lead
pub fn display_name(lead: &LeadResponse) -> &str {
    lead.company
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or(UNNAMED_LEAD)
}

/// Badge text for a lead's photo count, `None` when it has none
pub fn photo_badge(lead: &LeadResponse) -> Option<String> {
    match lead.photo_paths.len() {
        0 => None,
        1 => Some("1 file".to_string()),
        n => Some(format!("{n} files")),
    }
}
