use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::app::App;
use crate::auth::CredentialStore;
use crate::capture::{CaptureSurface, StillImageSurface};
use crate::detect::{DetectionPoller, DetectionState};
use crate::router::Route;
use crate::utils::{format_date, format_mm, truncate_string};

use super::{prompt, prompt_password};

/// Maximum username column width in the accounts table
const USERNAME_COLUMN_WIDTH: usize = 24;

/// JPEG quality for the full-resolution capture
const CAPTURE_JPEG_QUALITY: f32 = 0.92;

/// Top-level page loop. Returns when the operator quits.
pub async fn run(app: &mut App) -> Result<()> {
    loop {
        let keep_going = match app.route {
            Route::Login => login_page(app).await?,
            Route::ChangePassword => change_password_page(app).await?,
            Route::Camera => camera_page(app).await?,
            Route::Validation => validation_page(app).await?,
            Route::Confirmation => confirmation_page(app).await?,
            Route::AdminUsers => admin_page(app).await?,
        };
        if !keep_going {
            return Ok(());
        }
    }
}

fn page_header(route: Route) {
    println!("\n=== {} ===", route.title());
}

async fn login_page(app: &mut App) -> Result<bool> {
    page_header(Route::Login);

    let username = match app.config.last_username.clone() {
        Some(last_user) => {
            let input = prompt(&format!("Username [{}]: ", last_user))?;
            if input.is_empty() {
                last_user
            } else {
                input
            }
        }
        None => prompt("Username: ")?,
    };

    if username == "q" || username == "quit" {
        return Ok(false);
    }

    let password = if CredentialStore::has_credentials(&username) {
        let answer = prompt("Use stored password? [Y/n]: ")?;
        if answer.to_lowercase() != "n" {
            CredentialStore::get_password(&username)?
        } else {
            prompt_password("Password: ")?
        }
    } else {
        prompt_password("Password: ")?
    };

    match app.login(&username, &password).await {
        Ok(()) => println!("Signed in."),
        Err(e) => println!("Login failed: {}", e),
    }
    Ok(true)
}

async fn change_password_page(app: &mut App) -> Result<bool> {
    page_header(Route::ChangePassword);
    if app.session.force_password_change() {
        println!("Your provisional password must be replaced before continuing.");
    }

    let current = prompt_password("Current password: ")?;
    let new = prompt_password("New password: ")?;
    let confirm = prompt_password("Confirm new password: ")?;

    if new != confirm {
        println!("Passwords do not match.");
        return Ok(true);
    }

    match app.change_password(&current, &new).await {
        Ok(()) => println!("Password changed."),
        Err(e) => println!("Change failed: {}", e),
    }
    Ok(true)
}

async fn camera_page(app: &mut App) -> Result<bool> {
    page_header(Route::Camera);
    if let Some(username) = app.session.username() {
        println!("Signed in as {}", username);
    }
    if app.take_forbidden_notice() {
        println!("! Access restricted to administrators.");
    }

    let mut capture: Option<(Arc<StillImageSurface>, DetectionState, DetectionPoller)> = None;

    loop {
        let command =
            prompt("camera> (open <photo.jpg> | status | capture | admin | logout | quit) ")?;
        let mut parts = command.splitn(2, ' ');
        match (parts.next().unwrap_or(""), parts.next()) {
            ("open", Some(path)) => {
                match StillImageSurface::open(Path::new(path.trim())) {
                    Ok(surface) => {
                        let surface = Arc::new(surface);
                        println!(
                            "Surface attached ({}x{}). Live detection running.",
                            surface.width(),
                            surface.height()
                        );
                        let state = DetectionState::new();
                        let mut poller = DetectionPoller::new(
                            app.api.clone(),
                            Arc::clone(&surface) as Arc<dyn crate::capture::CaptureSurface>,
                            state.clone(),
                        );
                        poller.start();
                        capture = Some((surface, state, poller));
                    }
                    Err(e) => println!("Cannot open photo: {}", e),
                }
            }
            ("status", _) => match capture {
                Some((_, ref state, ref poller)) => {
                    if !poller.is_running() {
                        println!("Live detection is stopped.");
                    } else if state.card_detected() {
                        println!("Calibration card detected - ready to capture.");
                    } else {
                        println!("No calibration card in view yet.");
                    }
                }
                None => println!("No surface attached. Use: open <photo.jpg>"),
            },
            ("capture", _) => match capture.take() {
                Some((surface, state, mut poller)) => {
                    if !state.card_detected() {
                        println!("Warning: capturing without a detected calibration card.");
                    }
                    poller.stop();
                    match surface.to_jpeg(CAPTURE_JPEG_QUALITY) {
                        Some(photo) => {
                            debug!(bytes = photo.len(), "Photo captured");
                            app.scan.set_photo(photo);
                            app.navigate(Route::Validation);
                            return Ok(true);
                        }
                        None => println!("The surface produced no frame."),
                    }
                }
                None => println!("No surface attached. Use: open <photo.jpg>"),
            },
            ("admin", _) => {
                app.navigate(Route::AdminUsers);
                return Ok(true);
            }
            ("logout", _) => {
                app.logout();
                return Ok(true);
            }
            ("quit", _) | ("q", _) => return Ok(false),
            _ => println!("Unknown command."),
        }
    }
}

async fn validation_page(app: &mut App) -> Result<bool> {
    page_header(Route::Validation);

    if !app.scan.has_photo() {
        println!("No photo captured yet.");
        app.navigate(Route::Camera);
        return Ok(true);
    }

    if !app.scan.has_result() {
        println!("Analysing photo...");
        match app.process_photo().await {
            Ok(()) => {}
            Err(e) => {
                println!("Analysis failed: {}", e);
                // A 401 already moved the app back to the login page
                return Ok(true);
            }
        }
    }

    print_result(app);

    loop {
        let command = prompt("validation> (show | thickness <mm> | submit | retake | quit) ")?;
        let mut parts = command.splitn(2, ' ');
        match (parts.next().unwrap_or(""), parts.next()) {
            ("show", _) => print_result(app),
            ("thickness", Some(value)) => match value.trim().parse::<f64>() {
                Ok(mm) if mm > 0.0 => {
                    app.scan.set_thickness(Some(mm));
                    println!("Thickness recorded: {}", format_mm(Some(mm)));
                }
                _ => println!("Thickness must be a positive number of millimetres."),
            },
            ("thickness", None) => {
                app.scan.set_thickness(None);
                println!("Thickness cleared.");
            }
            ("submit", _) => match app.submit_scan().await {
                Ok(response) if response.is_accepted() => {
                    app.navigate(Route::Confirmation);
                    return Ok(true);
                }
                Ok(response) => println!("Submission not accepted: {}", response.status),
                Err(e) => {
                    println!("Submission failed: {}", e);
                    if app.route == Route::Login {
                        return Ok(true);
                    }
                }
            },
            ("retake", _) => {
                app.scan.clear_photo();
                app.scan.clear_result();
                app.navigate(Route::Camera);
                return Ok(true);
            }
            ("quit", _) | ("q", _) => return Ok(false),
            _ => println!("Unknown command."),
        }
    }
}

fn print_result(app: &App) {
    let Some(result) = app.scan.result() else {
        println!("No analysis result.");
        return;
    };

    println!(
        "Gasket outline: {} points, {} x {}",
        result.contour_points.len(),
        format_mm(Some(result.dimensions.width_mm)),
        format_mm(Some(result.dimensions.height_mm)),
    );
    for (i, hole) in result.holes.iter().enumerate() {
        println!(
            "  hole {}: {} x {}",
            i + 1,
            format_mm(Some(hole.width_mm)),
            format_mm(Some(hole.height_mm)),
        );
    }
    if result.calibration_warning {
        println!("! No calibration card found - dimensions are approximate.");
    }
    println!("Thickness: {}", format_mm(app.scan.thickness_mm()));
}

async fn confirmation_page(app: &mut App) -> Result<bool> {
    page_header(Route::Confirmation);
    println!("Scan submitted successfully.");
    print_result(app);

    loop {
        let command = prompt("confirmation> (new | logout | quit) ")?;
        match command.as_str() {
            "new" => {
                app.new_scan();
                return Ok(true);
            }
            "logout" => {
                app.logout();
                return Ok(true);
            }
            "quit" | "q" => return Ok(false),
            _ => println!("Unknown command."),
        }
    }
}

async fn admin_page(app: &mut App) -> Result<bool> {
    page_header(Route::AdminUsers);

    loop {
        let command =
            prompt("admin> (list | add <username> | deactivate <username> | back | logout | quit) ")?;
        let mut parts = command.splitn(2, ' ');
        match (parts.next().unwrap_or(""), parts.next()) {
            ("list", _) => match app.list_users().await {
                Ok(users) => {
                    println!(
                        "{:<24} {:<14} {:<9} {}",
                        "username", "role", "status", "created"
                    );
                    for user in &users {
                        println!(
                            "{:<24} {:<14} {:<9} {}",
                            truncate_string(&user.username, USERNAME_COLUMN_WIDTH),
                            user.role.display_name(),
                            user.status_display(),
                            user.created_at.as_deref().map(format_date).unwrap_or_default(),
                        );
                    }
                }
                Err(e) => {
                    println!("Could not list accounts: {}", e);
                    if app.route == Route::Login {
                        return Ok(true);
                    }
                }
            },
            ("add", Some(username)) => {
                let username = username.trim().to_string();
                let password = prompt_password("Provisional password: ")?;
                match app.create_user(&username, &password).await {
                    Ok(user) => println!(
                        "Account '{}' created; the operator must change the password at first login.",
                        user.username
                    ),
                    Err(e) => {
                        println!("Creation failed: {}", e);
                        if app.route == Route::Login {
                            return Ok(true);
                        }
                    }
                }
            }
            ("deactivate", Some(username)) => {
                match app.deactivate_user(username.trim()).await {
                    Ok(user) => println!("Account '{}' is now {}.", user.username, user.status_display()),
                    Err(e) => {
                        println!("Deactivation failed: {}", e);
                        if app.route == Route::Login {
                            return Ok(true);
                        }
                    }
                }
            }
            ("back", _) => {
                app.navigate(Route::Camera);
                return Ok(true);
            }
            ("logout", _) => {
                app.logout();
                return Ok(true);
            }
            ("quit", _) | ("q", _) => return Ok(false),
            _ => println!("Unknown command."),
        }
    }
}
