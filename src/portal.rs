// Portal session: owns the WebDriver handle and everything that touches
// the live site. All page-structure knowledge is collected in
// `LocatorSet`, so when the portal's markup shifts only that table needs
// to change, not the navigation logic.

use anyhow::{Context, Result};
use regex::Regex;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::support;
use thirtyfour::ChromiumLikeCapabilities;

use crate::config::D2dConfig;
use crate::nav::{ChildItem, Location, ViewKind};

pub const PORTAL_URL: &str = "https://learn.uwaterloo.ca";
const HOME_PATH: &str = "/d2l/home";

/// Entry kinds that have no download action; labels ending in one of
/// these never make it into the listed file set.
const EXCLUDED_SUFFIXES: [&str; 4] = ["Link", "External Learning Tool", "Web Page", "Quiz"];

/// Every XPath the session uses against the portal, in one place. The
/// `d2l()` set matches the current D2L (Brightspace) markup.
pub struct LocatorSet {
    pub username_input: &'static str,
    pub password_input: &'static str,
    pub submit_button: &'static str,
    pub course_tiles: &'static str,
    pub course_nav_links: &'static str,
    pub grades_grid: &'static str,
    pub grade_rows: &'static str,
    pub content_sections: &'static str,
    pub content_panel: &'static str,
    pub toc_entries: &'static str,
    pub entry_menu_handle: &'static str,
    pub entry_menu_actions: &'static str,
}

impl LocatorSet {
    pub fn d2l() -> Self {
        Self {
            username_input: "//input[@name='username']",
            password_input: "//input[@name='password']",
            submit_button: "//input[@name='submit']",
            // The tile anchors are custom elements; plain HTML parsing
            // does not see them, which is why a real browser drives this.
            course_tiles: "//a[@class='d2l-image-tile-base-link style-scope d2l-image-tile-base']",
            course_nav_links: "//a[@class='d2l-navigation-s-link']",
            grades_grid: "//div[@class='d2l-grid-container']",
            grade_rows: "//tr",
            content_sections: "//li",
            content_panel: "//div[@class='d2l-twopanelselector-side-padding']",
            toc_entries: "//ul//ul//li[contains(@class, 'd2l-datalist-item') and contains(@class ,'d2l-datalist-simpleitem')]",
            entry_menu_handle: ".//a[@class='d2l-contextmenu-ph']",
            entry_menu_actions: ".//a[@class=' vui-dropdown-menu-item-link']",
        }
    }
}

/// A logged-in browser session against the portal. One per process; the
/// command loop borrows it for every operation and `close` tears the
/// browser down at the end.
pub struct PortalSession {
    driver: WebDriver,
    locators: LocatorSet,
    base_url: String,
    grades_loaded: bool,
    content_loaded: bool,
}

impl PortalSession {
    /// Connect to chromedriver and open a browser configured with the
    /// prefs from `d2d.config`.
    pub async fn connect(config: &D2dConfig) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg("--log-level=3")?;
        caps.add_experimental_option("prefs", config.prefs())?;

        let driver = WebDriver::new(&config.webdriver_url(), caps)
            .await
            .context("Failed to connect to chromedriver")?;

        // Sized before the first page load so the form fields count as
        // visible. Headless Chrome refuses to download files, so the
        // window stays real but minimized; WebDriver coordinates are
        // unsigned, which rules out parking it off-screen.
        driver.set_window_rect(0, 0, 1000, 1000).await?;
        driver.minimize_window().await?;

        Ok(Self {
            driver,
            locators: LocatorSet::d2l(),
            base_url: PORTAL_URL.to_string(),
            grades_loaded: false,
            content_loaded: false,
        })
    }

    /// Fill the two-field login form and submit. Returns `Ok(false)`
    /// when the browser does not land on the post-login home page,
    /// which the caller treats as invalid credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool> {
        self.driver
            .goto(&self.base_url)
            .await
            .context("Failed to open the portal")?;

        // "Remember me" may have prefilled either field.
        let field = self
            .driver
            .find(By::XPath(self.locators.username_input))
            .await
            .context("Could not find the username field")?;
        field.clear().await?;
        field.send_keys(username).await?;

        let field = self
            .driver
            .find(By::XPath(self.locators.password_input))
            .await
            .context("Could not find the password field")?;
        field.clear().await?;
        field.send_keys(password).await?;

        self.driver
            .find(By::XPath(self.locators.submit_button))
            .await
            .context("Could not find the login button")?
            .click()
            .await?;

        let landed = self.driver.current_url().await?;
        Ok(landed.as_str() == format!("{}{}", self.base_url, HOME_PATH))
    }

    pub async fn current_url(&self) -> Result<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    /// Release the browser handle. Best effort: called unconditionally
    /// on the way out, including after earlier failures.
    pub async fn close(self) {
        let _ = self.driver.quit().await;
    }

    /// Bounded wait for an element to show up, polling once per second.
    /// On timeout a message is printed and the caller reads whatever is
    /// present, possibly nothing. After a hit, one extra second lets the
    /// page's javascript finish rearranging things.
    async fn wait_for(&self, xpath: &str, secs: u64) {
        let mut waited = 0;
        loop {
            if self.driver.find(By::XPath(xpath)).await.is_ok() {
                break;
            }
            if waited >= secs {
                println!("Timed out waiting for page to load");
                return;
            }
            support::sleep(Duration::from_secs(1)).await;
            waited += 1;
        }
        support::sleep(Duration::from_secs(1)).await;
    }

    /// List the course tiles on the home page: trimmed display name plus
    /// the tile's link.
    pub async fn list_courses(&self) -> Result<Location> {
        // Let the tile javascript start before polling for the anchors.
        support::sleep(Duration::from_secs(1)).await;
        self.wait_for(self.locators.course_tiles, 10).await;

        let mut children = Vec::new();
        for tile in self
            .driver
            .find_all(By::XPath(self.locators.course_tiles))
            .await?
        {
            let name = tile.text().await?.trim().to_string();
            let link = tile.attr("href").await?;
            children.push(ChildItem { name, link });
        }

        Ok(Location {
            url: self.current_url().await?,
            kind: ViewKind::Root,
            children,
        })
    }

    /// List a course home page, keeping exactly the "Grades" and
    /// "Content" navigation links.
    pub async fn list_course_home(&self) -> Result<Location> {
        self.wait_for(self.locators.course_nav_links, 5).await;

        let mut children = Vec::new();
        for link in self
            .driver
            .find_all(By::XPath(self.locators.course_nav_links))
            .await?
        {
            let text = link.text().await?.trim().to_string();
            if text == "Grades" || text == "Content" {
                let href = link.attr("href").await?;
                children.push(ChildItem { name: text, link: href });
            }
        }

        Ok(Location {
            url: self.current_url().await?,
            kind: ViewKind::CourseHome,
            children,
        })
    }

    /// Print the grades table as raw rows. No structured extraction: the
    /// row text goes out as-is between rule lines, skipping the header.
    pub async fn list_grades(&mut self) -> Result<Location> {
        let secs = if self.grades_loaded { 1 } else { 3 };
        self.wait_for(self.locators.grades_grid, secs).await;
        self.grades_loaded = true;

        let rows = self
            .driver
            .find_all(By::XPath(self.locators.grade_rows))
            .await?;

        // A lone row is just the header.
        if rows.len() > 1 {
            println!("\n-------------------------------------------------");
            for row in rows.iter().skip(1) {
                println!("{}", row.text().await?);
                println!("-------------------------------------------------");
            }
        }

        Ok(Location {
            url: self.current_url().await?,
            kind: ViewKind::Grades,
            children: Vec::new(),
        })
    }

    /// Expand the table of contents and list its downloadable entries.
    /// Multi-line labels are cut down to their first line; labels ending
    /// in an excluded suffix are dropped.
    pub async fn list_content(&mut self) -> Result<Location> {
        let secs = if self.content_loaded { 2 } else { 8 };
        self.wait_for(self.locators.content_panel, secs).await;
        self.content_loaded = true;

        let mut children = Vec::new();
        for section in self
            .driver
            .find_all(By::XPath(self.locators.content_sections))
            .await?
        {
            let text = section.text().await.unwrap_or_default();
            if !text.starts_with("Table of Contents") {
                continue;
            }
            section
                .click()
                .await
                .context("Could not expand the table of contents")?;
            self.wait_for(self.locators.toc_entries, secs).await;
            support::sleep(Duration::from_secs(2)).await;

            for entry in self
                .driver
                .find_all(By::XPath(self.locators.toc_entries))
                .await?
            {
                let text = entry.text().await?;
                let label = text.trim();
                if label.is_empty() || !is_downloadable(label) {
                    continue;
                }
                children.push(ChildItem {
                    name: first_line(label),
                    link: None,
                });
            }
            break;
        }

        Ok(Location {
            url: self.current_url().await?,
            kind: ViewKind::Content,
            children,
        })
    }

    /// Trigger the per-entry download action for every listed entry that
    /// one of the user's fragments matches. Returns the resolved display
    /// names; a failure on one entry is reported and the rest proceed.
    pub async fn download_entries(&self, fragments: &[String], known: &[String]) -> Vec<String> {
        let patterns = compile_fragments(fragments);
        let mut resolved = Vec::new();
        if patterns.is_empty() {
            return resolved;
        }

        let entries = match self
            .driver
            .find_all(By::XPath(self.locators.toc_entries))
            .await
        {
            Ok(entries) => entries,
            Err(_) => return resolved,
        };

        for entry in entries {
            let text = match entry.text().await {
                Ok(text) => text,
                Err(_) => continue,
            };
            let label = first_line(text.trim());
            let Some(hit) = match_entry(&label, &patterns, known) else {
                continue;
            };
            match self.trigger_download(&entry).await {
                Ok(()) => resolved.push(hit),
                Err(_) => println!("Could not download {}.", hit),
            }
        }
        resolved
    }

    /// Open an entry's context menu and click its "Download" action.
    async fn trigger_download(&self, entry: &WebElement) -> Result<()> {
        entry
            .find(By::XPath(self.locators.entry_menu_handle))
            .await?
            .click()
            .await?;
        self.wait_for(self.locators.entry_menu_handle, 3).await;

        for action in entry
            .find_all(By::XPath(self.locators.entry_menu_actions))
            .await?
        {
            if action.text().await?.trim() == "Download" {
                action.click().await?;
            }
        }
        Ok(())
    }
}

fn is_downloadable(label: &str) -> bool {
    !EXCLUDED_SUFFIXES
        .iter()
        .any(|suffix| label.ends_with(suffix))
}

fn first_line(label: &str) -> String {
    label.lines().next().unwrap_or_default().trim().to_string()
}

/// Compile the user's comma-separated fragments as regexes. A pattern
/// that does not compile is reported and dropped; the rest still apply.
fn compile_fragments(fragments: &[String]) -> Vec<Regex> {
    let mut patterns = Vec::new();
    for fragment in fragments {
        match Regex::new(fragment) {
            Ok(re) => patterns.push(re),
            Err(_) => println!("Invalid pattern: {}", fragment),
        }
    }
    patterns
}

/// Decide whether an entry label is selected by the given fragments.
/// Every pattern is tried in order and the first one that fails to match
/// rejects the entry outright. A match counts only when its span has a
/// non-zero start or end (a zero-width match at the very start does not)
/// and the full label is present in the known child-name list.
fn match_entry(label: &str, patterns: &[Regex], known: &[String]) -> Option<String> {
    for pattern in patterns {
        let hit = pattern.find(label)?;
        if (hit.start() > 0 || hit.end() > 0) && known.iter().any(|k| k == label) {
            return Some(label.to_string());
        }
    }
    None
}
