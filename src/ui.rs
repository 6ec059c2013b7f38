// Command loop: a tiny shell over the portal. One line of input is one
// command; every command either fully succeeds or reports and leaves the
// navigation state exactly as it was.

use anyhow::Result;
use dialoguer::Input;

use crate::nav::{NavStack, ViewKind};
use crate::portal::PortalSession;
use crate::relay::DropboxRelay;

pub fn help_text() -> String {
    let mut text = String::from("\nList of available commands:\n");
    text.push_str("- h: help\n");
    text.push_str("- q: quit\n");
    text.push_str("- ls: list all files in current directory\n");
    text.push_str("- cd: change directory\n");
    text.push_str("- d2d: downloads specified file and drops it to your dropbox (Regex supported)\n");
    text
}

/// Run the interactive loop until the user quits. Lists the courses
/// first: that listing doubles as the welcome screen and seeds the
/// navigation stack with the root frame.
pub async fn command_loop(portal: &mut PortalSession, relay: &DropboxRelay) -> Result<()> {
    let mut nav = NavStack::new();

    let root = portal.list_courses().await?;
    let mut greeting = help_text();
    greeting.push_str("\nList of all the courses:\n");
    for child in &root.children {
        greeting.push_str(&format!("- {}\n", child.name));
    }
    println!("{}", greeting);
    nav.enter(root);

    loop {
        let line: String = Input::new()
            .with_prompt(">>>")
            .allow_empty(true)
            .interact_text()?;
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };

        match command {
            "ls" => ls(&nav),
            "cd" => cd(portal, &mut nav, args).await?,
            "d2d" => d2d(portal, relay, &nav, args).await?,
            "h" => println!("{}", help_text()),
            "q" => {
                println!("Exiting...");
                break;
            }
            _ => println!("Unknown command. Please type h to see list of commands available"),
        }
    }
    Ok(())
}

fn ls(nav: &NavStack) {
    let mut listing = String::from("\nFiles in current directory:\n");
    for name in nav.child_names() {
        listing.push_str(&format!("- {}\n", name));
    }
    println!("{}", listing);
}

async fn cd(portal: &mut PortalSession, nav: &mut NavStack, args: &[&str]) -> Result<()> {
    let target = join_target(args);

    if target == ".." {
        // Pop before navigating; the restored frame knows where to go
        // and what was listed there.
        match nav.up().map(|loc| loc.url.clone()) {
            None => println!("This is the home directory"),
            Some(url) => {
                portal.goto(&url).await?;
                println!("{}", url);
            }
        }
        return Ok(());
    }

    let link = match nav.resolve(&target) {
        Some(child) => child.link.clone(),
        None => {
            println!("{} does not exist", target);
            return Ok(());
        }
    };

    match nav.view() {
        Some(ViewKind::Root) => {
            let Some(link) = link else {
                println!("{} does not exist", target);
                return Ok(());
            };
            portal.goto(&link).await?;
            let location = portal.list_course_home().await?;
            nav.enter(location);
        }
        Some(ViewKind::CourseHome) => {
            let Some(link) = link else {
                println!("{} does not exist", target);
                return Ok(());
            };
            portal.goto(&link).await?;
            let location = if target == "Grades" {
                portal.list_grades().await?
            } else {
                portal.list_content().await?
            };
            nav.enter(location);
        }
        // Grades and content entries have nothing under them.
        _ => println!("{} is not a directory", target),
    }
    Ok(())
}

async fn d2d(
    portal: &PortalSession,
    relay: &DropboxRelay,
    nav: &NavStack,
    args: &[&str],
) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }
    if nav.view() != Some(ViewKind::Content) {
        println!("Please call d2d in Content directory.");
        return Ok(());
    }

    let fragments = split_fragments(args);
    let known = nav.child_names();
    let resolved = portal.download_entries(&fragments, &known).await;
    relay.relay_all(&resolved).await;
    Ok(())
}

/// Re-join the words after `cd` with single spaces: course names contain
/// whitespace and the loop already split the line.
fn join_target(args: &[&str]) -> String {
    args.join(" ").trim().to_string()
}

/// `d2d` arguments are comma-separated file fragments; the words between
/// commas are re-joined the same way `cd` targets are.
fn split_fragments(args: &[&str]) -> Vec<String> {
    args.join(" ")
        .split(',')
        .map(|fragment| fragment.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cd_target_rejoins_multi_word_names() {
        assert_eq!(join_target(&["CS", "241", "-", "Winter"]), "CS 241 - Winter");
        assert_eq!(join_target(&[".."]), "..");
        assert_eq!(join_target(&[]), "");
    }

    #[test]
    fn fragments_split_on_commas_and_trim() {
        assert_eq!(
            split_fragments(&["Lecture", "1,", "Assignment", "2"]),
            vec!["Lecture 1", "Assignment 2"]
        );
        assert_eq!(split_fragments(&["report.pdf"]), vec!["report.pdf"]);
    }

    #[test]
    fn help_lists_all_five_commands() {
        let text = help_text();
        for line in ["- h:", "- q:", "- ls:", "- cd:", "- d2d:"] {
            assert!(text.contains(line));
        }
    }
}
