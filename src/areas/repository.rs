//! Subprocess-backed repository gateway
//!
//! Implements [`Gateway`] by shelling out to the `git` binary against a
//! local bare repository. Every command line is echoed to the injected
//! writer so an operator can follow what a run is doing.
//!
//! Refs and loose objects that the rewrite produces are written straight to
//! the filesystem (`refs/heads/<name>`, `objects/<2-hex>/<38-hex>`) in the
//! formats stock git reads.

use crate::areas::gateway::{Gateway, PushRef};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::{Context, bail};
use fake::rand;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub struct Repository {
    path: PathBuf,
    writer: RefCell<Box<dyn Write>>,
}

impl Repository {
    pub fn new(path: impl Into<PathBuf>, writer: Box<dyn Write>) -> Self {
        Repository {
            path: path.into(),
            writer: RefCell::new(writer),
        }
    }

    pub fn set_config(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut command = self.git();
        command.args(["config", key, value]);
        self.execute(command)
    }

    /// Delete all local branch refs.
    pub fn remove_branches(&self) -> anyhow::Result<()> {
        let heads = self.path.join("refs").join("heads");
        if heads.exists() {
            std::fs::remove_dir_all(&heads)
                .with_context(|| format!("Unable to remove {}", heads.display()))?;
        }

        Ok(())
    }

    /// Delete all local tag refs.
    pub fn remove_tags(&self) -> anyhow::Result<()> {
        let tags = self.path.join("refs").join("tags");
        if tags.exists() {
            std::fs::remove_dir_all(&tags)
                .with_context(|| format!("Unable to remove {}", tags.display()))?;
        }

        Ok(())
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.arg(format!("--git-dir={}", self.path.display()));
        command
    }

    /// Run a command and capture its stdout.
    fn run(&self, command: Command) -> anyhow::Result<Vec<u8>> {
        let mut command = command;
        self.echo(&command)?;

        let output = command
            .output()
            .with_context(|| format!("Unable to run {}", display_command(&command)))?;

        if !output.status.success() {
            bail!(
                "Command failed ({}): {}\n{}",
                output.status,
                display_command(&command),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(output.stdout)
    }

    fn run_lines(&self, command: Command) -> anyhow::Result<Vec<String>> {
        let stdout = self.run(command)?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Run a command for its side effects, forwarding its output to the
    /// writer.
    fn execute(&self, command: Command) -> anyhow::Result<()> {
        let mut command = command;
        self.echo(&command)?;

        let output = command
            .output()
            .with_context(|| format!("Unable to run {}", display_command(&command)))?;

        let mut writer = self.writer.borrow_mut();
        writer.write_all(&output.stdout)?;
        writer.write_all(&output.stderr)?;
        drop(writer);

        if !output.status.success() {
            bail!(
                "Command failed ({}): {}",
                output.status,
                display_command(&command)
            );
        }

        Ok(())
    }

    /// Run a batch of commands concurrently. All children run to completion
    /// before failures are reported, so one failing process does not cancel
    /// siblings already in flight.
    fn execute_concurrent(&self, commands: Vec<Command>) -> anyhow::Result<()> {
        let mut children = Vec::new();
        for mut command in commands {
            self.echo(&command)?;
            command.stdout(Stdio::piped()).stderr(Stdio::piped());

            let display = display_command(&command);
            let child = command
                .spawn()
                .with_context(|| format!("Unable to run {display}"))?;
            children.push((display, child));
        }

        let mut failures = Vec::new();
        for (display, child) in children {
            let output = child
                .wait_with_output()
                .with_context(|| format!("Unable to wait for {display}"))?;

            let mut writer = self.writer.borrow_mut();
            writer.write_all(&output.stdout)?;
            writer.write_all(&output.stderr)?;
            drop(writer);

            if !output.status.success() {
                failures.push(format!("Command failed ({}): {display}", output.status));
            }
        }

        if !failures.is_empty() {
            bail!("{}", failures.join("\n"));
        }

        Ok(())
    }

    fn echo(&self, command: &Command) -> anyhow::Result<()> {
        writeln!(self.writer.borrow_mut(), "   $ {}", display_command(command))?;

        Ok(())
    }

    fn push_refspec(&self, refspec: &str, remote: &str, force: bool) -> anyhow::Result<()> {
        let mut command = self.git();
        command.arg("push");
        if force {
            command.arg("--force");
        }
        command.arg(remote).arg(refspec);

        self.execute(command)
    }

    fn push_refspecs(&self, refspecs: Vec<(String, String)>, force: bool) -> anyhow::Result<()> {
        let commands = refspecs
            .into_iter()
            .map(|(refspec, remote)| {
                let mut command = self.git();
                command.arg("push");
                if force {
                    command.arg("--force");
                }
                command.arg(remote).arg(refspec);
                command
            })
            .collect();

        self.execute_concurrent(commands)
    }

    fn write_ref(&self, path: PathBuf, hash: &ObjectId) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .with_context(|| format!("Invalid ref path {}", path.display()))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory {}", parent.display()))?;
        std::fs::write(&path, hash.as_ref())
            .with_context(|| format!("Unable to write ref {}", path.display()))?;

        Ok(())
    }
}

impl Gateway for Repository {
    fn init(&self) -> anyhow::Result<()> {
        let mut command = Command::new("git");
        command.arg("init").arg("--bare").arg(&self.path);

        self.execute(command)
    }

    fn add_remote(&self, name: &str, url: &str) -> anyhow::Result<()> {
        let mut list = self.git();
        list.arg("remote");
        let existing = self.run_lines(list)?;

        let mut command = self.git();
        if existing.iter().any(|remote| remote == name) {
            command.args(["remote", "set-url", name, url]);
        } else {
            command.args(["remote", "add", name, url]);
        }

        self.execute(command)
    }

    fn remove_remote(&self, name: &str) -> anyhow::Result<()> {
        let mut command = self.git();
        command.args(["remote", "rm", name]);

        self.execute(command)
    }

    fn fetch(&self, remote: &str) -> anyhow::Result<()> {
        let mut command = self.git();
        command.args(["fetch", "--no-tags", remote]);

        self.execute(command)
    }

    fn fetch_concurrent(&self, remotes: &[String]) -> anyhow::Result<()> {
        let commands = remotes
            .iter()
            .map(|remote| {
                let mut command = self.git();
                command.args(["fetch", "--no-tags", remote]);
                command
            })
            .collect();

        self.execute_concurrent(commands)
    }

    fn fetch_tags(&self, remote: &str, prefix: &str) -> anyhow::Result<()> {
        let mut command = self.git();
        command.args([
            "fetch",
            "--no-tags",
            remote,
            &format!("+refs/tags/*:refs/tags/{prefix}*"),
        ]);

        self.execute(command)
    }

    fn fetch_tag(&self, tag: &str, remote: &str, prefix: &str) -> anyhow::Result<()> {
        let mut command = self.git();
        command.args([
            "fetch",
            "--no-tags",
            remote,
            &format!("+refs/tags/{tag}:refs/tags/{prefix}{tag}"),
        ]);

        self.execute(command)
    }

    fn get_remote_branches(&self, remote: &str) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        let mut command = self.git();
        command.args(["branch", "-r"]);

        let mut branches = BTreeMap::new();
        let prefix = format!("{remote}/");
        for branch in self.run_lines(command)? {
            let branch = branch.trim();
            // "mono/HEAD -> mono/main" entries are aliases, not branches
            if branch.is_empty() || branch.contains(" -> ") {
                continue;
            }
            let Some(branch) = branch.strip_prefix(&prefix) else {
                continue;
            };

            let mut resolve = self.git();
            resolve.args(["rev-parse", &format!("{remote}/{branch}")]);
            let hash = self
                .run_lines(resolve)?
                .first()
                .map(|line| ObjectId::try_parse(line.trim()))
                .with_context(|| format!("Unable to resolve branch {remote}/{branch}"))??;

            branches.insert(branch.to_string(), hash);
        }

        Ok(branches)
    }

    fn get_tags(&self, prefix: &str) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        let mut command = self.git();
        command.args(["tag", "-l", &format!("{prefix}*")]);

        let mut tags = BTreeMap::new();
        for tag in self.run_lines(command)? {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            let name = &tag[prefix.len()..];
            let hash = self.get_tag(tag)?;

            tags.insert(name.to_string(), hash);
        }

        Ok(tags)
    }

    fn get_tag(&self, tag: &str) -> anyhow::Result<ObjectId> {
        let mut command = self.git();
        command.args(["rev-list", "-n", "1", tag]);

        let lines = self.run_lines(command)?;
        match lines.first() {
            Some(line) if line.trim().len() == OBJECT_ID_LENGTH => ObjectId::try_parse(line.trim()),
            _ => bail!("Tag {tag} not found."),
        }
    }

    fn get_commit(&self, hash: &ObjectId) -> anyhow::Result<Commit> {
        let mut command = self.git();
        command.args(["cat-file", "commit", hash.as_ref()]);

        let raw = self.run(command)?;
        Commit::new(raw).with_context(|| format!("Unable to parse commit {hash}"))
    }

    fn get_tree(&self, hash: &ObjectId) -> anyhow::Result<Tree> {
        let mut command = self.git();
        command.args(["cat-file", "tree", hash.as_ref()]);

        let raw = self.run(command)?;
        Tree::new(raw).with_context(|| format!("Unable to parse tree {hash}"))
    }

    fn add_object(&self, object: &dyn GitObject) -> anyhow::Result<()> {
        let hash = object.hash();
        let path = self.path.join("objects").join(hash.to_path());

        if path.exists() {
            return Ok(());
        }

        let dir = path
            .parent()
            .with_context(|| format!("Invalid object path {}", path.display()))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Unable to create object directory {}", dir.display()))?;

        // Write through a temp file and rename so readers never observe a
        // partially written object
        let temp_path = dir.join(format!("tmp-obj-{}", rand::random::<u32>()));
        std::fs::write(&temp_path, object.encoded()?)
            .with_context(|| format!("Unable to write object file {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Unable to rename object file to {}", path.display()))?;

        Ok(())
    }

    fn commit_tree(
        &self,
        tree: &ObjectId,
        message: &str,
        parents: &[ObjectId],
        copy_date_from_parents: bool,
    ) -> anyhow::Result<ObjectId> {
        let mut command = self.git();
        command.arg("commit-tree");

        if copy_date_from_parents {
            let mut date = None;
            for parent in parents {
                let parent_date = self.get_commit(parent)?.committer_date()?;
                if date.is_none_or(|date| parent_date > date) {
                    date = Some(parent_date);
                }
            }
            if let Some(date) = date {
                let date = format!("{} {}", date.timestamp(), date.format("%z"));
                command.env("GIT_AUTHOR_DATE", &date);
                command.env("GIT_COMMITTER_DATE", &date);
            }
        }

        for parent in parents {
            command.arg("-p").arg(parent.as_ref());
        }
        command.arg("-m").arg(message).arg(tree.as_ref());

        let lines = self.run_lines(command)?;
        lines
            .first()
            .map(|line| ObjectId::try_parse(line.trim()))
            .with_context(|| format!("No commit created for tree {tree}"))?
    }

    fn add_branch(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()> {
        self.write_ref(self.path.join("refs").join("heads").join(name), hash)
    }

    fn add_tag(&self, name: &str, hash: &ObjectId) -> anyhow::Result<()> {
        self.write_ref(self.path.join("refs").join("tags").join(name), hash)
    }

    fn remove_tag(&self, name: &str) -> anyhow::Result<()> {
        let mut command = self.git();
        command.args(["tag", "-d", name]);

        self.execute(command)
    }

    fn push_branch(
        &self,
        local_branch: &str,
        remote: &str,
        remote_branch: &str,
        force: bool,
    ) -> anyhow::Result<()> {
        self.push_refspec(
            &format!("refs/heads/{local_branch}:refs/heads/{remote_branch}"),
            remote,
            force,
        )
    }

    fn push_branches(&self, branches: &[PushRef], force: bool) -> anyhow::Result<()> {
        self.push_refspecs(
            branches
                .iter()
                .map(|(local, remote, remote_branch)| {
                    (
                        format!("refs/heads/{local}:refs/heads/{remote_branch}"),
                        remote.clone(),
                    )
                })
                .collect(),
            force,
        )
    }

    fn push_tag(
        &self,
        local_tag: &str,
        remote: &str,
        remote_tag: &str,
        force: bool,
    ) -> anyhow::Result<()> {
        self.push_refspec(
            &format!("refs/tags/{local_tag}:refs/tags/{remote_tag}"),
            remote,
            force,
        )
    }

    fn push_tags(&self, tags: &[PushRef], force: bool) -> anyhow::Result<()> {
        self.push_refspecs(
            tags.iter()
                .map(|(local, remote, remote_tag)| {
                    (
                        format!("refs/tags/{local}:refs/tags/{remote_tag}"),
                        remote.clone(),
                    )
                })
                .collect(),
            force,
        )
    }
}

fn display_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
