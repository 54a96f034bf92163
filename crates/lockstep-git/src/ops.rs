//! `GitOps` over the git command line

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use lockstep_core::collab::GitOps;
use lockstep_core::error::Result;

use crate::repository::GitRepo;

#[async_trait]
impl GitOps for GitRepo {
    #[instrument(skip(self))]
    async fn remote_by_partial_url(&self, partial_url: &str) -> Result<Option<String>> {
        let remotes = self.run("list remotes", &["remote", "-v"]).await?;
        let found = remotes.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let url = fields.next()?;
            url.contains(partial_url).then(|| name.to_string())
        });
        debug!(partial_url, remote = ?found, "looked up remote");
        Ok(found)
    }

    async fn branch_sha(&self, branch: &str, remote: Option<&str>) -> Result<Option<String>> {
        let reference = match remote {
            Some(remote) => format!("refs/remotes/{}/{}", remote, branch),
            None => format!("refs/heads/{}", branch),
        };
        self.rev_parse(&format!("get sha of branch {}", branch), &reference)
            .await
    }

    async fn tag_sha(&self, tag: &str) -> Result<Option<String>> {
        self.rev_parse(&format!("get sha of tag {}", tag), &format!("refs/tags/{}", tag))
            .await
    }

    #[instrument(skip(self))]
    async fn is_branch_up_to_date(&self, branch: &str, remote: &str) -> Result<bool> {
        self.run(&format!("fetch {}", remote), &["fetch", remote])
            .await?;
        let local = self.branch_sha(branch, None).await?;
        let upstream = self.branch_sha(branch, Some(remote)).await?;
        let up_to_date = local.is_some() && local == upstream;
        if !up_to_date {
            warn!(branch, remote, local = ?local, upstream = ?upstream, "branch differs from remote");
        }
        Ok(up_to_date)
    }

    async fn current_branch(&self) -> Result<String> {
        self.head_branch()
    }

    #[instrument(skip(self))]
    async fn create_branch(&self, branch: &str) -> Result<()> {
        self.run(
            &format!("create branch {}", branch),
            &["checkout", "-b", branch],
        )
        .await?;
        info!(branch, "created branch");
        Ok(())
    }

    async fn switch_branch(&self, branch: &str) -> Result<()> {
        self.run(&format!("switch to branch {}", branch), &["checkout", branch])
            .await?;
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        self.run(&format!("delete branch {}", branch), &["branch", "-D", branch])
            .await?;
        Ok(())
    }

    async fn add_all(&self) -> Result<()> {
        self.run("stage changes", &["add", "--all"]).await?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn commit(&self, message: &str) -> Result<()> {
        self.run_with_input("commit", &["commit", "-F", "-"], Some(message))
            .await?;
        Ok(())
    }

    async fn create_tag(&self, tag: &str) -> Result<()> {
        self.run(&format!("create tag {}", tag), &["tag", tag]).await?;
        Ok(())
    }

    async fn delete_tag(&self, tag: &str) -> Result<()> {
        self.run(&format!("delete tag {}", tag), &["tag", "-d", tag])
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn push_tag(&self, tag: &str, remote: &str) -> Result<()> {
        self.run(
            &format!("push tag {} to {}", tag, remote),
            &["push", remote, tag],
        )
        .await?;
        info!(tag, remote, "pushed tag");
        Ok(())
    }

    async fn status(&self) -> Result<String> {
        self.run("get status", &["status", "--porcelain"]).await
    }

    async fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let base = self
            .run(&format!("find merge base of {} and {}", a, b), &["merge-base", a, b])
            .await?;
        Ok(base.trim().to_string())
    }

    async fn rev_list(&self, commit: &str, branch: &str) -> Result<Vec<String>> {
        let range = format!("{}..{}", commit, branch);
        let out = self
            .run(&format!("list commits in {}", range), &["rev-list", &range])
            .await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    #[instrument(skip(self))]
    async fn merge_or_abort(&self, commit: &str) -> Result<bool> {
        let output = self
            .output(
                &format!("merge {}", commit),
                &["merge", "--no-edit", commit],
                None,
            )
            .await?;
        if output.status.success() {
            return Ok(true);
        }
        warn!(commit, "merge failed, aborting");
        self.run("abort merge", &["merge", "--abort"]).await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::setup_repo;

    #[tokio::test]
    async fn test_branches() {
        let (_temp, repo) = setup_repo();
        assert_eq!(repo.current_branch().await.unwrap(), "main");
        assert!(repo.branch_sha("main", None).await.unwrap().is_some());

        repo.create_branch("work").await.unwrap();
        assert_eq!(repo.current_branch().await.unwrap(), "work");
        assert!(repo.create_branch("work").await.is_err());

        repo.switch_branch("main").await.unwrap();
        repo.delete_branch("work").await.unwrap();
        assert!(repo.branch_sha("work", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_message_from_stdin() {
        let (temp, repo) = setup_repo();
        std::fs::write(temp.path().join("file.txt"), "changed").unwrap();
        assert!(!repo.status().await.unwrap().is_empty());

        repo.add_all().await.unwrap();
        repo.commit("Bump client to 1.3.0\n\nclient: 1.2.0 -> 1.3.0\n")
            .await
            .unwrap();
        assert!(repo.status().await.unwrap().is_empty());

        let log = repo.run("read log", &["log", "-1", "--format=%B"]).await.unwrap();
        assert!(log.starts_with("Bump client to 1.3.0"));
        assert!(log.contains("client: 1.2.0 -> 1.3.0"));
    }

    #[tokio::test]
    async fn test_tags() {
        let (_temp, repo) = setup_repo();
        assert!(repo.tag_sha("client_v1.2.0").await.unwrap().is_none());

        repo.create_tag("client_v1.2.0").await.unwrap();
        let tag = repo.tag_sha("client_v1.2.0").await.unwrap();
        assert_eq!(tag, repo.branch_sha("main", None).await.unwrap());

        repo.delete_tag("client_v1.2.0").await.unwrap();
        assert!(repo.tag_sha("client_v1.2.0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_by_partial_url() {
        let (_temp, repo) = setup_repo();
        assert_eq!(repo.remote_by_partial_url("example/repo").await.unwrap(), None);

        repo.run(
            "add remote",
            &["remote", "add", "upstream", "https://github.com/example/repo.git"],
        )
        .await
        .unwrap();
        assert_eq!(
            repo.remote_by_partial_url("github.com/example/repo")
                .await
                .unwrap(),
            Some("upstream".to_string())
        );
    }

    #[tokio::test]
    async fn test_merge_base_and_rev_list() {
        let (temp, repo) = setup_repo();
        let base = repo.branch_sha("main", None).await.unwrap().unwrap();

        repo.create_branch("work").await.unwrap();
        std::fs::write(temp.path().join("other.txt"), "x").unwrap();
        repo.add_all().await.unwrap();
        repo.commit("second").await.unwrap();

        assert_eq!(repo.merge_base("main", "work").await.unwrap(), base);
        assert_eq!(repo.rev_list("main", "work").await.unwrap().len(), 1);

        repo.switch_branch("main").await.unwrap();
        assert!(repo.merge_or_abort("work").await.unwrap());
    }

    #[tokio::test]
    async fn test_merge_conflict_is_aborted() {
        let (temp, repo) = setup_repo();
        let file = temp.path().join("file.txt");

        repo.create_branch("work").await.unwrap();
        std::fs::write(&file, "from work").unwrap();
        repo.add_all().await.unwrap();
        repo.commit("work change").await.unwrap();

        repo.switch_branch("main").await.unwrap();
        std::fs::write(&file, "from main").unwrap();
        repo.add_all().await.unwrap();
        repo.commit("main change").await.unwrap();
        let head = repo.branch_sha("main", None).await.unwrap();

        assert!(!repo.merge_or_abort("work").await.unwrap());
        assert!(repo.status().await.unwrap().is_empty());
        assert_eq!(repo.current_branch().await.unwrap(), "main");
        assert_eq!(repo.branch_sha("main", None).await.unwrap(), head);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "from main");
    }
}
