use crate::cert::Certificate;
use crate::filter::search::{CertificateFilter, SearchField, StatusFilter};
use std::fmt;
use std::str::FromStr;

pub const PAGE_SIZE_CHOICES: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Fixed(usize),
    All,
}

impl Default for PageSize {
    fn default() -> Self {
        Self::Fixed(10)
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match s.parse::<usize>() {
            Ok(n) if PAGE_SIZE_CHOICES.contains(&n) => Ok(Self::Fixed(n)),
            _ => Err(format!(
                "Invalid page size: {s} (expected 10, 25, 50, 100 or all)"
            )),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// One visible window of the filtered list
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub items: Vec<&'a Certificate>,
    pub number: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    start: usize,
}

impl Page<'_> {
    /// 1-based index of the first visible row, 0 when empty
    pub fn first_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.start + 1
        }
    }

    pub fn last_row(&self) -> usize {
        self.start + self.items.len()
    }
}

/// Presentation state for the certificate table.
///
/// Changing the search term, search field or status filter sends the view
/// back to page 1; changing the page size only moves the window.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    filter: CertificateFilter,
    page_size: PageSize,
    current_page: usize,
}

impl ViewState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            filter: CertificateFilter::default(),
            page_size,
            current_page: 1,
        }
    }

    pub fn filter(&self) -> &CertificateFilter {
        &self.filter
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page.max(1)
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.filter.search_term = term.into();
        self.current_page = 1;
    }

    pub fn set_search_field(&mut self, field: SearchField) {
        self.filter.search_field = field;
        self.current_page = 1;
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filter.status = status;
        self.current_page = 1;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
    }

    /// Requested page; clamped when a window is computed
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn filtered<'a>(&self, certificates: &'a [Certificate]) -> Vec<&'a Certificate> {
        self.filter.apply(certificates)
    }

    pub fn total_pages(&self, filtered_count: usize) -> usize {
        match self.page_size {
            PageSize::All => 1,
            PageSize::Fixed(size) => filtered_count.div_ceil(size.max(1)).max(1),
        }
    }

    pub fn page<'a>(&self, certificates: &'a [Certificate]) -> Page<'a> {
        let filtered = self.filtered(certificates);
        let filtered_count = filtered.len();
        let total_pages = self.total_pages(filtered_count);
        let number = self.current_page().clamp(1, total_pages);

        let (start, items) = match self.page_size {
            PageSize::All => (0, filtered),
            PageSize::Fixed(size) => {
                let start = (number - 1) * size;
                (start, filtered.into_iter().skip(start).take(size).collect())
            }
        };

        Page {
            items,
            number,
            total_pages,
            filtered_count,
            start,
        }
    }
}
