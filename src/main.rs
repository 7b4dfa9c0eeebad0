use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edu_portal::admin::AdminConsole;
use edu_portal::catalog::CatalogCache;
use edu_portal::config::PortalConfig;
use edu_portal::domain::{Bahasa, Material, Session};
use edu_portal::gateway::HttpGateway;
use edu_portal::quiz::{self, ManualGrading, QuizEngine};
use edu_portal::session::SessionStore;
use edu_portal::storage::LocalStore;
use edu_portal::validation::Credentials;
use edu_portal::videos::VideoLibrary;
use edu_portal::{PortalError, Result};

const USAGE: &str = "usage: edu_portal <command> [args]

  login <email> <password>
  logout
  whoami
  subjects
  materials <subject_id>
  quiz <materials_id>
  submit <materials_id> <number=answer>...
  submissions <materials_id>
  grade <user_id> <materials_id> <number=score>...
  users
  videos
  video <prompt> [indonesia|english]";

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "edu_portal=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let args: Vec<String> = std::env::args().skip(1).collect();
  match run(&args).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(PortalError::Validation(msg)) if msg == USAGE => {
      eprintln!("{}", USAGE);
      ExitCode::from(2)
    }
    Err(e) => {
      tracing::debug!("Command failed: {}", e);
      eprintln!("error: {}", e.user_message());
      ExitCode::FAILURE
    }
  }
}

fn usage() -> PortalError {
  PortalError::validation(USAGE)
}

async fn run(args: &[String]) -> Result<()> {
  let Some((command, rest)) = args.split_first() else {
    return Err(usage());
  };

  let config = PortalConfig::load()?;
  let store = LocalStore::open(&config.store_path)?;
  let gateway = HttpGateway::new(&config, store.clone())?;
  let mut sessions = SessionStore::restore(store);
  tracing::debug!(base_url = gateway.base_url(), "Client ready");

  match (command.as_str(), rest) {
    ("login", [email, password]) => {
      let session = sessions.login(&gateway, &Credentials::new(email, password)).await?;
      print_session(&session);
    }
    ("logout", []) => {
      sessions.logout(&gateway).await;
      println!("Logged out");
    }
    ("whoami", []) => print_session(sessions.current()),
    ("subjects", []) => {
      let cache = CatalogCache::new();
      cache.load_for_session(&gateway, sessions.current()).await;
      fail_on(cache.error())?;
      for subject in cache.subjects() {
        println!("{}\tclass {}\t{}", subject.subject_id, subject.class, subject.name);
      }
    }
    ("materials", [subject_id]) => {
      let cache = CatalogCache::new();
      cache.load_for_session(&gateway, sessions.current()).await;
      fail_on(cache.error())?;
      cache.load_materials_for(&gateway, subject_id).await;
      fail_on(cache.materials_error(subject_id))?;
      let subject = cache
        .subject(subject_id)
        .ok_or_else(|| PortalError::not_found("subject", subject_id.as_str()))?;
      for material in subject.materials.unwrap_or_default() {
        println!("{}\t{}", material.materials_id, material.title());
      }
    }
    ("quiz", [materials_id]) => {
      let material = locate_material(&gateway, sessions.current(), materials_id).await?;
      let engine = QuizEngine::open(&gateway, sessions.current(), &material).await?;
      print_quiz(&engine);
    }
    ("submit", [materials_id, answers @ ..]) if !answers.is_empty() => {
      let material = locate_material(&gateway, sessions.current(), materials_id).await?;
      let mut engine = QuizEngine::open(&gateway, sessions.current(), &material).await?;
      if engine.state().is_submitted() {
        engine.retake()?;
      }
      for (number, answer) in parse_pairs(answers)? {
        engine.set_answer(number, answer)?;
      }
      let record = engine.submit(&gateway).await?;
      println!("Grade: {:.2}{}", record.grade, if record.status { "" } else { " (awaiting manual grading)" });
    }
    ("submissions", [materials_id]) => {
      for record in quiz::list_submissions(&gateway, sessions.current(), materials_id).await? {
        let state = if record.status { "graded" } else { "pending" };
        println!("{}\t{:.2}\t{}", record.user_id, record.grade, state);
      }
    }
    ("grade", [user_id, materials_id, scores @ ..]) if !scores.is_empty() => {
      let session = sessions.current();
      let record = quiz::list_submissions(&gateway, session, materials_id)
        .await?
        .into_iter()
        .find(|r| &r.user_id == user_id)
        .ok_or_else(|| PortalError::not_found("submission", user_id.as_str()))?;
      let material = locate_material(&gateway, session, materials_id).await?;
      let payload = material
        .content
        .ok_or_else(|| PortalError::not_found("quiz", materials_id.as_str()))?;

      let mut form = ManualGrading::open(record, payload);
      for (number, raw) in parse_pairs(scores)? {
        let raw: i64 = raw
          .parse()
          .map_err(|_| PortalError::validation(format!("Score for question {} is not a number", number)))?;
        form.set_score(number, raw)?;
      }
      let updated = form.submit(&gateway, session).await?;
      println!("Grade: {:.2} ({})", updated.grade, if updated.status { "complete" } else { "partial" });
    }
    ("users", []) => {
      let mut console = AdminConsole::new();
      for user in console.list_users(&gateway, sessions.current()).await? {
        println!(
          "{}\t{}\t{}\t{}\tgrade {}\t{}",
          user.id,
          user.email,
          user.name,
          user.role.as_str(),
          user.grade,
          user.school_name
        );
      }
    }
    ("videos", []) => {
      let user_id = signed_in_user(sessions.current())?;
      let mut library = VideoLibrary::new(&config.media_base_url);
      for video in library.list(&gateway, &user_id).await? {
        println!("{:?}\t{}\t{}", video.kind, video.src, video.prompt.as_deref().unwrap_or("-"));
      }
    }
    ("video", [prompt, language @ ..]) if language.len() <= 1 => {
      let user_id = signed_in_user(sessions.current())?;
      let bahasa = match language.first() {
        Some(l) => Bahasa::from_str(l).ok_or_else(|| PortalError::validation("Unknown language"))?,
        None => Bahasa::default(),
      };
      let mut library = VideoLibrary::new(&config.media_base_url);
      let videos = library.request_video(&gateway, prompt, &user_id, bahasa).await?;
      println!("Requested; {} video(s) listed", videos.len());
    }
    _ => return Err(usage()),
  }
  Ok(())
}

fn fail_on(error: Option<String>) -> Result<()> {
  match error {
    Some(message) => Err(PortalError::Network(message)),
    None => Ok(()),
  }
}

fn signed_in_user(session: &Session) -> Result<String> {
  session
    .user_id()
    .map(str::to_string)
    .ok_or_else(|| PortalError::Forbidden("Not signed in".into()))
}

/// Find a material by id, loading subject materials until it turns up.
async fn locate_material(gateway: &HttpGateway, session: &Session, materials_id: &str) -> Result<Material> {
  let cache = CatalogCache::new();
  cache.load_for_session(gateway, session).await;
  fail_on(cache.error())?;
  for subject in cache.subjects() {
    cache.load_materials_for(gateway, &subject.subject_id).await;
    if let Ok((_, material)) = cache.find_material(materials_id) {
      return Ok(material);
    }
  }
  Err(PortalError::not_found("material", materials_id))
}

/// Parse `3=B` style arguments.
fn parse_pairs(args: &[String]) -> Result<Vec<(u32, String)>> {
  args
    .iter()
    .map(|arg| {
      let (number, value) = arg
        .split_once('=')
        .ok_or_else(|| PortalError::validation(format!("Expected number=value, got '{}'", arg)))?;
      let number = number
        .trim()
        .parse()
        .map_err(|_| PortalError::validation(format!("'{}' is not a question number", number)))?;
      Ok((number, value.to_string()))
    })
    .collect()
}

fn print_session(session: &Session) {
  match (session.user.as_ref(), session.role()) {
    (Some(user), Some(role)) => {
      let name = session.profile.as_ref().map(|p| p.name.as_str()).unwrap_or("");
      println!("{} <{}> {} grade {}", name, user.email, role.as_str(), session.grade());
    }
    _ => println!("Not signed in"),
  }
}

fn print_quiz(engine: &QuizEngine) {
  let view = engine.view();
  println!("# {} [{}]", view.title, view.state);
  if !view.materi_belajar.is_empty() {
    println!("\n{}\n", view.materi_belajar);
  }
  for question in &view.questions {
    println!("{}. {}", question.number, question.question);
    for option in &question.options {
      println!("   {}", option);
    }
    if let Some(answer) = view.answers.get(&question.number) {
      println!("   > {}", answer);
    }
  }
  if let Some(key) = &view.answer_key {
    println!("\nAnswer key:");
    for answer in key {
      println!("{}. {}", answer.number, answer.answer);
    }
  }
  if let Some(record) = &view.record {
    println!("\nGrade: {:.2}", record.grade);
  }
}
